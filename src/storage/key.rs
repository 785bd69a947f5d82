use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();

/// 剔除安全白名单（字母、数字、下划线、连字符、点、空格）之外的字符
fn sanitize(filename: &str) -> String {
    let re = UNSAFE_CHARS.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-. ]").expect("内置正则"));
    re.replace_all(filename, "").into_owned()
}

/// 由所有者 id 与逻辑路径推导对象存储键。
///
/// 键的首段永远是所有者 id——即使字节是通过分享链接由第三方上传的，
/// 对象也落在原所有者的命名空间下。纯函数，无副作用。
pub fn derive_key(owner: &str, filename: &str, parent_path: &str) -> String {
    let sanitized = sanitize(filename);
    if parent_path.is_empty() {
        format!("{}/{}", owner, sanitized)
    } else {
        format!("{}/{}/{}", owner, parent_path, sanitized)
    }
}

/// 在扩展名前插入 4 字节随机十六进制后缀，用于创建时的同名冲突避让
pub fn unique_variant(filename: &str) -> String {
    let mut suffix = [0u8; 4];
    rand::thread_rng().fill(&mut suffix[..]);
    let hex: String = suffix.iter().map(|b| format!("{:02x}", b)).collect();

    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, hex, ext),
        _ => format!("{}-{}", filename, hex),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_joins_owner_path_and_name() {
        assert_eq!(derive_key("u1", "a.txt", "Docs"), "u1/Docs/a.txt");
        assert_eq!(derive_key("u1", "a.txt", ""), "u1/a.txt");
        assert_eq!(
            derive_key("u1", "report.pdf", "Docs/2024"),
            "u1/Docs/2024/report.pdf"
        );
    }

    #[test]
    fn derive_key_strips_unsafe_characters() {
        assert_eq!(derive_key("u1", "a/b:c?.txt", ""), "u1/abc.txt");
        assert_eq!(derive_key("u1", "数据 report-1.txt", ""), "u1/ report-1.txt");
    }

    #[test]
    fn unique_variant_keeps_extension() {
        let variant = unique_variant("a.txt");
        assert!(variant.starts_with("a-"));
        assert!(variant.ends_with(".txt"));
        assert_eq!(variant.len(), "a-.txt".len() + 8);
    }

    #[test]
    fn unique_variant_without_extension_appends_suffix() {
        let variant = unique_variant("README");
        assert!(variant.starts_with("README-"));
        assert_eq!(variant.len(), "README-".len() + 8);
    }

    #[test]
    fn unique_variant_handles_leading_dot() {
        let variant = unique_variant(".gitignore");
        assert!(variant.starts_with(".gitignore-"));
    }

    #[test]
    fn variants_differ_between_calls() {
        assert_ne!(unique_variant("a.txt"), unique_variant("a.txt"));
    }
}
