//! 在 256 x 256 瓦片上评估 2013-2017 时间序列预测.

mod result;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .expect("Logger initialization error");

    match runner::run() {
        Ok(result) => result.analyze(),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
