//! Feeding an inbound chunk stream through parser and workbench

use crate::error::WorkbenchError;
use crate::parser::StreamingParser;
use crate::workbench::Workbench;
use forge_types::ParseEvent;
use futures::{Stream, StreamExt};
use tracing::debug;

/// Split `text` into chunks of at most `size` bytes on char boundaries
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(text[start..end].to_string());
        start = end;
    }
    chunks
}

/// Consume `chunks` until end of stream, routing every event to the
/// workbench. `on_event` sees each event before it is routed.
///
/// Returns the number of events produced. Does not wait for queued actions;
/// call [`Workbench::settled`] for that.
pub async fn drive<S, F>(
    parser: &mut StreamingParser,
    workbench: &mut Workbench,
    mut chunks: S,
    mut on_event: F,
) -> Result<usize, WorkbenchError>
where
    S: Stream<Item = String> + Unpin,
    F: FnMut(&ParseEvent),
{
    let mut count = 0;
    let mut received = 0;

    while let Some(chunk) = chunks.next().await {
        received += 1;
        for event in parser.feed(&chunk) {
            on_event(&event);
            workbench.handle_event(event)?;
            count += 1;
        }
    }

    for event in parser.finish() {
        on_event(&event);
        workbench.handle_event(event)?;
        count += 1;
    }

    debug!("Stream ended after {} chunks, {} events", received, count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForgeConfig;
    use forge_types::ActionStatus;
    use std::time::Duration;

    #[test]
    fn test_chunk_text_respects_char_boundaries() {
        let chunks = chunk_text("aé€b", 2);
        assert_eq!(chunks.concat(), "aé€b");
        assert!(chunks.iter().all(|c| !c.is_empty()));
        assert!(chunk_text("", 4).is_empty());
        assert_eq!(chunk_text("abc", 0), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_drive_routes_events() {
        let response = concat!(
            "Here you go.\n",
            "<boltArtifact id=\"demo\" title=\"Demo\">",
            "<boltAction type=\"file\" filePath=\"index.js\">console.log('hi');</boltAction>",
            "<boltAction type=\"shell\">node index.js</boltAction>",
            "</boltArtifact>"
        );
        let mut parser = StreamingParser::new();
        let mut workbench = Workbench::new(
            ForgeConfig::default().with_shell_delay(Duration::from_millis(1)),
        );

        let mut texts = String::new();
        let chunks = futures::stream::iter(chunk_text(response, 7));
        let count = drive(&mut parser, &mut workbench, chunks, |event| {
            if let ParseEvent::Text { text } = event {
                texts.push_str(text);
            }
        })
        .await
        .unwrap();
        workbench.settled().await;

        assert!(count > 6);
        assert_eq!(texts, "Here you go.\n");

        let artifact = workbench.artifact("demo").unwrap();
        assert!(artifact.closed());
        assert_eq!(artifact.runner().status("1"), Some(ActionStatus::Complete));
        assert_eq!(
            workbench.files().get_file("home/project/index.js").unwrap().content,
            "console.log('hi');\n"
        );
    }
}
