use std::sync::Arc;

use chord_node::config;
use chord_node::endpoint::run_endpoint;
use chord_node::logging::init_logging;
use chord_node::logging::LogLevel;
use chord_node::prelude::Bootstrap;
use chord_node::prelude::NodeId;
use chord_node::processor::ProcessorBuilder;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value_t = LogLevel::Info, value_enum, env)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    #[command(about = "Writes a configuration file with default values.")]
    Init(InitCommand),
    #[command(about = "Hosts ring members and keeps them stabilized.")]
    Run(RunCommand),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(
        long,
        short = 'c',
        env,
        default_value = "~/.chord/config.yaml",
        help = "Config file location"
    )]
    pub config: String,
}

#[derive(Args, Debug)]
struct InitCommand {
    #[arg(
        long,
        default_value = "~/.chord/config.yaml",
        help = "The location of config file"
    )]
    pub location: String,

    #[arg(long, help = "Fixed hex id of the first member. Minted when absent")]
    pub id: Option<NodeId>,

    #[arg(long, help = "Bootstrap to join, as [id@]address:port. Seeds a ring when absent")]
    pub join: Option<Bootstrap>,
}

#[derive(Args, Debug)]
struct RunCommand {
    #[arg(
        long,
        short = 'b',
        help = "Websocket listen address. If not provided, use bind_addr in config file or 127.0.0.1:8000",
        env
    )]
    pub bind_addr: Option<String>,

    #[arg(long, help = "Address advertised to other members", env)]
    pub external_address: Option<String>,

    #[arg(long, help = "Port advertised to other members", env)]
    pub external_port: Option<u16>,

    #[arg(long, help = "Fixed hex id of the first member", env = "NODE_ID")]
    pub id: Option<NodeId>,

    #[arg(
        long,
        short = 'j',
        help = "Bootstrap to join, as [id@]address:port. If not provided, use join in config file",
        env
    )]
    pub join: Option<Bootstrap>,

    #[arg(long, help = "Number of members hosted by this process", env)]
    pub virtual_nodes: Option<usize>,

    #[arg(long, help = "Milliseconds between stabilization ticks", env)]
    pub stabilize_interval: Option<u64>,

    #[arg(long, help = "Width of the identifier space, 1 to 128", env)]
    pub identifier_bits: Option<u8>,

    #[arg(long, help = "Ignore the config file and use defaults plus flags")]
    pub no_config: bool,

    #[command(flatten)]
    config_args: ConfigArgs,
}

fn get_value<V>(value: Option<V>, default_value: V) -> V {
    value.unwrap_or(default_value)
}

async fn daemon_run(args: RunCommand) -> anyhow::Result<()> {
    let c = if args.no_config {
        config::Config::default()
    } else {
        config::Config::read_fs(args.config_args.config.as_str())?
    };

    let c = config::Config {
        bind_addr: get_value(args.bind_addr, c.bind_addr),
        external_address: get_value(args.external_address, c.external_address),
        external_port: get_value(args.external_port, c.external_port),
        identifier_bits: get_value(args.identifier_bits, c.identifier_bits),
        stabilize_interval: get_value(args.stabilize_interval, c.stabilize_interval),
        node_id: args.id.or(c.node_id),
        virtual_nodes: get_value(args.virtual_nodes, c.virtual_nodes),
        join: args.join.or(c.join),
        scheme: c.scheme,
    };

    let processor = Arc::new(ProcessorBuilder::from_config(&c)?.build()?);
    match &c.join {
        Some(bootstrap) => println!("Joining ring through {}", bootstrap),
        None => println!("Seeding a new ring"),
    }
    run_endpoint(processor).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Command::Run(args) => daemon_run(args).await,
        Command::Init(args) => {
            let config = config::Config {
                node_id: args.id,
                join: args.join,
                ..Default::default()
            };
            config.validate()?;
            let p = config.write_fs(args.location.as_str())?;
            println!("Your config file has saved to: {}", p);
            Ok(())
        }
    }
}
