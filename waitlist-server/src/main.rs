use waitlist_server::{Config, Server, ServerState, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 环境变量 (.env 可选)
    dotenv::dotenv().ok();

    // 2. 加载配置并准备目录 (日志目录要先存在)
    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    // 3. 日志：开发环境打到终端，生产环境滚动文件
    let log_dir = config.log_dir();
    if config.is_production() {
        init_logger_with_file(Some(&config.log_level), log_dir.to_str());
    } else {
        init_logger_with_file(Some(&config.log_level), None);
    }

    print_banner();
    tracing::info!("Mesa waitlist server starting...");

    // 4. 初始化服务器状态并运行
    let state = ServerState::initialize(&config).await;
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
