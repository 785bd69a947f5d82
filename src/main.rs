mod api;
mod auth;
mod db;
mod fs;
mod logger;
mod share;
mod storage;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::info;
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;

use fs::{FsManager, PostgresNodeStore};
use share::{PostgresShareStore, ShareManager};
use storage::{ObjectStorage, S3Config, S3ObjectStorage};

// 应用状态
pub struct AppState {
    pub fs: FsManager<PostgresNodeStore>,
    pub shares: ShareManager<PostgresShareStore, PostgresNodeStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 加载 .env
    dotenv().ok();

    // 创建日志目录
    let log_dir = std::path::Path::new("logs");
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    // 初始化日志系统
    let log_path = log_dir.join("app.log");
    if let Err(e) = logger::Logger::init(&log_path) {
        eprintln!("初始化日志系统失败: {}", e);
    }

    info!("应用程序启动");

    // 连接数据库
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("数据库连接错误: {}", e)))?;

    // 初始化数据库
    db::initialize_db(pool.clone())
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("数据库初始化错误: {}", e)))?;

    // 对象存储
    let s3_config = S3Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("对象存储配置错误: {}", e)))?;
    let object_storage: Arc<dyn ObjectStorage> = Arc::new(
        S3ObjectStorage::new(s3_config).map_err(|e| {
            io::Error::new(io::ErrorKind::Other, format!("对象存储初始化错误: {}", e))
        })?,
    );

    // 创建管理器
    let fs_manager = FsManager::new(PostgresNodeStore::new(pool.clone()), object_storage.clone());
    let share_manager = ShareManager::new(
        PostgresShareStore::new(pool.clone()),
        PostgresNodeStore::new(pool.clone()),
    );

    let app_state = web::Data::new(AppState {
        fs: fs_manager,
        shares: share_manager,
        storage: object_storage,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    println!("服务器启动在 http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(api::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
