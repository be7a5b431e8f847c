//! Interactive credibility prompt on stdin.

use std::io::Write;

use meme_lens::{LlmError, LlmResponse, Pipeline};
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: [&str; 3] = ["sair", "exit", "quit"];

pub fn is_exit(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    EXIT_WORDS.contains(&input.as_str())
}

/// What the user sees for one reply.
pub fn render_reply(reply: Result<LlmResponse, LlmError>) -> String {
    match reply {
        Ok(response) if response.is_success() => match response.first_text() {
            Some(text) => format!("Gemini: {text}"),
            None => format!("Response: {}", response.body),
        },
        Ok(response) => format!("Error {}\nMessage: {}", response.status, response.body),
        Err(e) => format!("Error {}\nMessage: {e}", e.status_code()),
    }
}

pub async fn run_cli(pipeline: &Pipeline) -> anyhow::Result<()> {
    println!("=== Meme Lens credibility CLI ===");
    println!("Type 'sair' or 'exit' to quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit(input) {
            println!("\nBye.");
            break;
        }

        println!("\nProcessing...");
        let reply = pipeline.credibility(input).await;
        println!("\n{}\n", render_reply(reply));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meme_lens::testing::{error_reply, ok_reply};
    use std::time::Duration;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("sair"));
        assert!(is_exit("  EXIT "));
        assert!(is_exit("Quit"));
        assert!(!is_exit("sairam"));
    }

    #[test]
    fn test_render_success_prints_candidate_text() {
        let rendered = render_reply(Ok(ok_reply("credibilidade 4")));
        assert_eq!(rendered, "Gemini: credibilidade 4");
    }

    #[test]
    fn test_render_upstream_error() {
        let rendered = render_reply(Ok(error_reply(403, "forbidden")));
        assert!(rendered.starts_with("Error 403"));
        assert!(rendered.contains("forbidden"));
    }

    #[test]
    fn test_render_timeout() {
        let rendered = render_reply(Err(LlmError::Timeout(Duration::from_secs(1))));
        assert!(rendered.starts_with("Error 504"));
    }
}
