use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};

use uroute::{extract_url, logging, ConfigManager, RuleCacheManager, RuleCompiler, RuleLoader, Uroute};

/// 清理URL并路由到已配置的浏览器/程序
#[derive(Parser, Debug)]
#[command(name = "uroute")]
#[command(about = "Clean a URL with ClearURLs rules and route it to a configured program")]
#[command(version)]
struct Cli {
    /// 要打开的URL（缺省时从标准输入提取第一个 http(s) URL）
    url: Option<String>,

    /// 指定程序ID
    #[arg(short, long)]
    program: Option<String>,

    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    /// 不清理URL
    #[arg(long)]
    no_clean: bool,

    /// 只打印命令，不启动
    #[arg(long)]
    dry_run: bool,

    /// 删除本地规则文件后退出（可与 --update-rules 同用）
    #[arg(long)]
    clear_rules: bool,

    /// 路由前强制拉取远程规则
    #[arg(long)]
    update_rules: bool,

    /// 校验规则集中的全部正则后退出
    #[arg(long)]
    check_rules: bool,

    /// 列出已配置的程序后退出
    #[arg(long)]
    list: bool,

    /// 详细日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("uroute error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(ConfigManager::config_path);
    let file = ConfigManager::load_or_init(&config_path)
        .with_context(|| format!("无法加载配置文件 {}", config_path.display()))?;

    logging::init_logging(cli.verbose, file.logging.level.as_deref())?;
    debug!("使用配置文件：{}", config_path.display());

    let mut builder = ConfigManager::custom().apply_file(&file).verbose(cli.verbose);
    if cli.no_clean {
        builder = builder.clean_urls(false);
    }
    let config = builder.build();

    if cli.list {
        let default_program = file.main.default_program.as_deref();
        for entry in &file.programs {
            let marker = if Some(entry.id.as_str()) == default_program { "*" } else { " " };
            println!("{} {:<20} {:<28} {}", marker, entry.id, entry.name, entry.command);
        }
        return Ok(());
    }

    if cli.clear_rules {
        RuleCacheManager::clear_cache(&config).await?;
        info!("已删除本地规则文件：{}", config.rules_path.display());
        if !cli.update_rules {
            return Ok(());
        }
    }

    if cli.update_rules {
        let rule_set = RuleLoader::fetch_remote(&config).await?;
        info!("规则已更新，Provider数：{}", rule_set.len());
    }

    if cli.check_rules {
        let rule_set = RuleLoader::load(&config).await?;
        let stats = RuleCompiler::validate(&rule_set);
        println!(
            "providers: {}, patterns: {}, backtracking: {}",
            stats.provider_count, stats.pattern_count, stats.backtracking_count
        );
        for failure in &stats.failures {
            println!("[{}] {}: {}", failure.provider, failure.pattern, failure.message);
        }
        if !stats.failures.is_empty() {
            bail!("{} 条正则无法编译", stats.failures.len());
        }
        return Ok(());
    }

    let url = match cli.url {
        Some(url) => url,
        None if cli.update_rules => return Ok(()),
        None => read_url_from_stdin()?,
    };

    let router = Uroute::from_config(config, &file).await;
    let preferred = cli.program.as_deref();

    if cli.dry_run {
        let plan = router.route(&url, preferred)?;
        println!("{}", plan.args.join(" "));
        return Ok(());
    }

    router.run(&url, preferred)?;
    Ok(())
}

fn read_url_from_stdin() -> Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("未提供URL");
    }

    let mut contents = String::new();
    stdin.read_to_string(&mut contents).context("读取标准输入失败")?;

    match extract_url(&contents) {
        Some(url) => Ok(url.to_string()),
        None => bail!("标准输入中未找到URL"),
    }
}
