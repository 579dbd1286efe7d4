use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "arcfs")]
#[command(version)]
#[command(about = "Inspect ZIP and ISO9660 archives as read-only filesystems", long_about = None)]
#[command(after_help = "Examples:\n  \
  arcfs -l data.zip              list every path in data.zip\n  \
  arcfs -v image.iso             verbose listing with sizes and timestamps\n  \
  arcfs -p image.iso /etc/motd   write one file's contents to stdout")]
pub struct Cli {
    /// ZIP archive or ISO9660 image
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Archive paths to read (default: list the whole tree)
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// List paths (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with mode, size and timestamp
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Write file contents to stdout, no messages
    #[arg(short = 'p')]
    pub pipe: bool,
}

impl Cli {
    pub fn wants_listing(&self) -> bool {
        self.list || self.verbose || self.paths.is_empty()
    }
}
