use clap::Parser;
use std::path::PathBuf;

use crate::repository::online::DEFAULT_ENDPOINT;
use crate::settings::InitialSelection;

pub const HELP_COMMANDS: &str = "\
Commands (one per line):
  n / next        : Next comic
  p / prev        : Previous comic
  f / first       : First comic
  l / last        : Latest comic
  r / random      : Random comic
  g [N]           : Go to comic N (asks for N if omitted)
  s / fav         : Toggle favorite for the shown comic
  favs            : List favorites
  sort            : Flip favorites order (ascending / descending)
  open N          : Show favorite N
  + / - / 0       : Zoom in / out / actual size
  fit WxH         : Set the viewport size used for fitting
  save PATH       : Save the shown comic as PNG
  i               : Show comic info
  ? / help        : This help
  q / quit        : Quit
";

#[derive(Parser)]
#[command(name = "comic-viewer", about = "Browse a daily web comic", after_help = HELP_COMMANDS)]
pub struct Cli {
    /// Comic to show on startup
    #[arg(short, long, value_enum, default_value_t = InitialSelection::Latest)]
    pub initial: InitialSelection,

    /// Base URL of the comic JSON endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Use the bundled offline comics instead of the network
    #[arg(long)]
    pub offline: bool,

    /// Serve comics from a fixture directory (implies --offline)
    #[arg(long, value_name = "DIR")]
    pub fixtures: Option<PathBuf>,

    /// Favorites file. Defaults to favorites.json in the settings directory.
    #[arg(long, value_name = "FILE")]
    pub favorites: Option<PathBuf>,

    /// Keep favorites in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// HTTP user agent
    #[arg(long, default_value = concat!("comic-viewer/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Viewport used to compute the fit scale, e.g. 800x600
    #[arg(long, default_value = "800x600", value_parser = parse_viewport)]
    pub viewport: (f64, f64),
}

/// Parse `WIDTHxHEIGHT`. Either side may be `inf` for an unbounded viewport.
pub fn parse_viewport(s: &str) -> Result<(f64, f64), String> {
    let s = s.trim().to_lowercase();
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
    let parse = |v: &str| -> Result<f64, String> {
        let v: f64 = v.trim().parse().map_err(|_| format!("invalid dimension {:?}", v))?;
        if v < 0.0 || v.is_nan() {
            return Err(format!("dimension must not be negative, got {}", v));
        }
        Ok(v)
    };
    Ok((parse(w)?, parse(h)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_parsing() {
        assert_eq!(parse_viewport("800x600"), Ok((800.0, 600.0)));
        assert_eq!(parse_viewport(" 1024X768 "), Ok((1024.0, 768.0)));
        assert_eq!(parse_viewport("infx600"), Ok((f64::INFINITY, 600.0)));
        assert!(parse_viewport("800").is_err());
        assert!(parse_viewport("-1x5").is_err());
        assert!(parse_viewport("wide x tall").is_err());
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["comic-viewer"]);
        assert_eq!(cli.initial, InitialSelection::Latest);
        assert_eq!(cli.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cli.viewport, (800.0, 600.0));
        assert!(!cli.offline && !cli.ephemeral);
    }

    #[test]
    fn offline_random() {
        let cli = Cli::parse_from(["comic-viewer", "--offline", "-i", "random", "--viewport", "400x300"]);
        assert!(cli.offline);
        assert_eq!(cli.initial, InitialSelection::Random);
        assert_eq!(cli.viewport, (400.0, 300.0));
    }
}
