use clap::Parser;
use keyhunt_cli::cli_args::{Mode, Opt};
use keyhunt_cli::modes::replay::replay;
use keyhunt_cli::modes::token::token;
use tracing::level_filters::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .finish(),
    )?;

    let opt = Opt::parse();

    match opt.mode {
        Mode::Replay(r) => {
            let json = r.json;
            let report = replay(r).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
        Mode::Token(t) => {
            token(t).await?;
        }
    };

    Ok(())
}
