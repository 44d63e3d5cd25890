//! Interactive question loop.

use std::future::Future;
use std::io;

use acs_chat_core::CallOptions;
use acs_chat_core::ChatSession;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::messages::describe;
use crate::reveal::Reveal;

pub const BANNER: &str = "\
Hi, I'm Andy. Ask me about Census American Community Survey data from Social Explorer.
Type /history to see our conversation so far, or /quit to leave.
";
pub const PROMPT: &str = "Ask a question about ACS data: ";
pub const BLANK_INPUT: &str = "Please enter a question.";
pub const INTERRUPTED: &str = "[interrupted]";
const EMPTY_HISTORY: &str = "No conversation yet.";
const SEPARATOR_WIDTH: usize = 60;

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    History,
    Blank,
    Ask(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "" => Command::Blank,
        "/quit" | "/exit" => Command::Quit,
        "/history" => Command::History,
        question => Command::Ask(question),
    }
}

pub struct Repl<R, W> {
    input: R,
    output: W,
    session: ChatSession,
    options: CallOptions,
    reveal: Reveal,
    handle_ctrl_c: bool,
}

impl<R, W> Repl<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W, session: ChatSession) -> Self {
        Self {
            input,
            output,
            session,
            options: CallOptions::new(),
            reveal: Reveal::disabled(),
            handle_ctrl_c: false,
        }
    }

    /// Base options for every question. Each question gets its own child
    /// cancellation token.
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub const fn with_reveal(mut self, reveal: Reveal) -> Self {
        self.reveal = reveal;
        self
    }

    /// Cancel the question in flight on Ctrl-C, and leave the loop on Ctrl-C
    /// at the prompt.
    pub const fn with_ctrl_c(mut self, enabled: bool) -> Self {
        self.handle_ctrl_c = enabled;
        self
    }

    pub const fn session(&self) -> &ChatSession {
        &self.session
    }

    pub async fn run(&mut self) -> io::Result<()> {
        self.output.write_all(BANNER.as_bytes()).await?;

        loop {
            self.output.write_all(PROMPT.as_bytes()).await?;
            self.output.flush().await?;

            let Some(line) = self.read_line().await? else {
                self.output.write_all(b"\n").await?;
                break;
            };

            match parse_command(&line) {
                Command::Quit => break,
                Command::Blank => self.write_line(BLANK_INPUT).await?,
                Command::History => {
                    let transcript = self.session.history().transcript();
                    if transcript.is_empty() {
                        self.write_line(EMPTY_HISTORY).await?;
                    } else {
                        self.write_line(&transcript).await?;
                    }
                }
                Command::Ask(question) => self.ask(question).await?,
            }
        }

        self.output.flush().await
    }

    async fn ask(&mut self, question: &str) -> io::Result<()> {
        let token = self.options.cancellation().child_token();
        let options = self.options.clone().with_cancellation(token.clone());

        // Stays armed through the reveal so Ctrl-C also cuts a long answer short.
        let watcher = self.handle_ctrl_c.then(|| {
            let token = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("interrupt received, cancelling question");
                    token.cancel();
                }
            })
        });
        let result = self.session.ask(question, &options).await;

        let written = match result {
            Ok(answer) => self.show_answer(&answer, token.cancelled()).await,
            Err(err) => self.write_line(&describe(&err)).await,
        };
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        written
    }

    async fn show_answer<F>(&mut self, answer: &str, interrupt: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let finished = self
            .reveal
            .write_until(&mut self.output, answer, interrupt)
            .await?;
        self.output.write_all(b"\n").await?;
        if !finished {
            self.write_line(INTERRUPTED).await?;
        }
        self.write_line(&"=".repeat(SEPARATOR_WIDTH)).await
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let read = if self.handle_ctrl_c {
            tokio::select! {
                read = self.input.read_line(&mut line) => read?,
                _ = tokio::signal::ctrl_c() => return Ok(None),
            }
        } else {
            self.input.read_line(&mut line).await?
        };
        Ok((read > 0).then_some(line))
    }

    async fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_test_support::ScriptedBackend;
    use core_test_support::ScriptedIndex;
    use core_test_support::StaticEmbedder;
    use core_test_support::acs_match;
    use core_test_support::orchestrator;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn session(backend: Arc<ScriptedBackend>) -> ChatSession {
        let index = ScriptedIndex::with_matches(vec![acs_match(
            "B01003_001",
            "Total population, Vermont: 647,464",
            0.9,
        )]);
        ChatSession::new(Arc::new(orchestrator(
            Arc::new(StaticEmbedder::new()),
            Arc::new(index),
            backend,
            4,
        )))
    }

    async fn run_script(input: &str, backend: Arc<ScriptedBackend>) -> (String, ChatSession) {
        let mut repl = Repl::new(input.as_bytes(), Vec::new(), session(backend));
        repl.run().await.unwrap();
        let Repl {
            output, session, ..
        } = repl;
        (String::from_utf8(output).unwrap(), session)
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  \n"), Command::Blank);
        assert_eq!(parse_command("/quit\n"), Command::Quit);
        assert_eq!(parse_command("/history"), Command::History);
        assert_eq!(
            parse_command(" How many people live in Vermont? \n"),
            Command::Ask("How many people live in Vermont?")
        );
    }

    #[tokio::test]
    async fn test_blank_then_question_then_eof() {
        let backend = Arc::new(ScriptedBackend::answering(["About 647,464 people."]));
        let (output, session) =
            run_script("\nHow many people live in Vermont?\n", backend.clone()).await;

        assert!(output.starts_with(BANNER));
        assert!(output.contains(&format!("{PROMPT}{BLANK_INPUT}\n")));
        assert!(output.contains(&format!("About 647,464 people.\n{}\n", "=".repeat(60))));
        assert_eq!(backend.calls(), 1);
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_quit_stops_reading() {
        let backend = Arc::new(ScriptedBackend::answering(["unused"]));
        let (_, session) = run_script("/quit\nStill here?\n", backend.clone()).await;
        assert_eq!(backend.calls(), 0);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_shows_full_transcript() {
        let backend = Arc::new(ScriptedBackend::answering(["647,464."]));
        let (output, _) =
            run_script("/history\nPopulation of Vermont?\n/history\n", backend).await;

        assert!(output.contains(EMPTY_HISTORY));
        assert!(output.contains("User: Population of Vermont?\n\nAssistant: 647,464."));
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_loop_continues() {
        let backend = Arc::new(ScriptedBackend::failing_once(503, "overloaded"));
        let (output, session) = run_script("First try?\nSecond try?\n", backend.clone()).await;

        assert!(output.contains("The language model is unavailable right now."));
        assert_eq!(backend.calls(), 2);
        // Only the successful retry is recorded.
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().turns()[0].content(), "Second try?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_reveal_cuts_answer_short() {
        let answer = "Vermont had 647,464 residents in the 2020 five-year estimates.";
        let backend = Arc::new(ScriptedBackend::answering([answer]));
        let options = CallOptions::new();
        let cancel = options.cancellation().clone();
        let mut repl = Repl::new("Population of Vermont?\n".as_bytes(), Vec::new(), session(backend))
            .with_options(options)
            .with_reveal(Reveal::new(std::time::Duration::from_millis(10)));

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(35)).await;
            cancel.cancel();
        });
        repl.run().await.unwrap();

        let output = String::from_utf8(repl.output).unwrap();
        assert!(output.contains(&format!("\n{INTERRUPTED}\n")));
        assert!(!output.contains(answer));
        // The answer was generated, so the exchange is still recorded.
        assert_eq!(repl.session.history().len(), 2);
    }
}
