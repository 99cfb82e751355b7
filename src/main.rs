use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use paper_summarize::orchestrator::{render_report, Pipeline};
use paper_summarize::utils::logging;
use paper_summarize::Config;

const USAGE: &str = "用法: paper_summarize <文档路径> [--config <配置文件>]";

struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut input = None;
    let mut config = std::env::var_os("SUMMARIZE_CONFIG").map(PathBuf::from);

    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args.next().context("--config 缺少参数")?;
            config = Some(PathBuf::from(path));
        } else if arg == "-h" || arg == "--help" {
            println!("{}", USAGE);
            std::process::exit(0);
        } else if input.is_none() {
            input = Some(PathBuf::from(arg));
        } else {
            bail!("多余的参数: {:?}\n{}", arg, USAGE);
        }
    }

    let input = input.context(USAGE)?;
    Ok(Args { input, config })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    // 加载配置
    let config = Config::load(args.config.as_deref())?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config, &args.input);

    // 初始化并运行流水线
    let pipeline = Pipeline::initialize(config).await?;
    let output = pipeline.run(&args.input).await?;

    print!(
        "{}",
        render_report(
            &output.summary,
            pipeline.backend().endpoint(),
            pipeline.backend().model_name(),
            &output.usage,
        )
    );

    Ok(())
}
