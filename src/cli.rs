use clap::Parser;

/// CLI arguments for arkcom
#[derive(Parser, Debug)]
#[command(name = "arkcom")]
#[command(about = "Arkcom - terminal assistant with multi-session Gemini chat")]
#[command(version)]
pub struct Cli {
    /// Model used for new chats (e.g. gemini-2.5-flash, gemini-2.5-pro)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Disable the web-grounding tool for opened chats
    #[arg(long)]
    pub no_grounding: bool,

    /// Directory holding chat history and logs (default: ~/.arkcom)
    #[arg(long, value_name = "DIR")]
    pub storage_dir: Option<String>,

    /// Override the Generative Language API base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Verbose request/stream debugging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub plain: bool,
}
