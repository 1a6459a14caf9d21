use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::store::NavigationState;
use crate::ui::state::ViewerState;

pub mod render;
pub mod state;

// ---------------------------------------------------------------------------
// Line-oriented front end
// ---------------------------------------------------------------------------

pub struct App {
    pub state: ViewerState,
}

impl App {
    pub fn new(state: ViewerState) -> Self {
        Self { state }
    }

    /// Read commands from stdin until `q` or end of input.
    pub async fn run(&mut self) -> std::io::Result<()> {
        // Loading notices come from the store's watch channel so they show up
        // while a fetch is still running.
        let mut updates = self.state.comics.subscribe();
        let watcher = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let state = updates.borrow_and_update().clone();
                match state {
                    NavigationState::Loading { number } => {
                        log::debug!("[ui] loading {}", number);
                        println!("Loading comic {}...", number);
                    }
                    NavigationState::Loaded { comic, zoom, .. } => {
                        log::debug!("[ui] showing {} at zoom {:.1}", comic.number, zoom);
                    }
                    NavigationState::Failed { number, .. } => {
                        log::debug!("[ui] comic {} failed", number);
                    }
                }
            }
        });

        let mut stdout = tokio::io::stdout();
        let result = self.run_with(BufReader::new(tokio::io::stdin()), &mut stdout).await;
        watcher.abort();
        result
    }

    pub async fn run_with<R, W>(&mut self, input: R, out: &mut W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        write_lines(out, &self.state.status_lines()).await?;
        write_lines(out, &["Type ? for help.".to_string()]).await?;

        while let Some(line) = lines.next_line().await? {
            let output = self.state.handle_line(&line).await;
            write_lines(out, &output).await?;
            if self.state.quit {
                break;
            }
        }
        log::info!("Bye");
        Ok(())
    }
}

async fn write_lines<W: AsyncWrite + Unpin>(out: &mut W, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }
    out.flush().await
}
