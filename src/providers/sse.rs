// Server-Sent Events decoding for streamed chat responses

use std::io::{self, BufRead};

/// One dispatched event: the optional `event:` name and the joined `data:` lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// What a provider makes of a single event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Text(String),
    Skip,
    Done,
}

/// Iterator over the events in a line-oriented SSE body
pub struct SseDecoder<R> {
    reader: R,
    line: String,
    finished: bool,
}

impl<R: BufRead> SseDecoder<R> {
    #[inline]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for SseDecoder<R> {
    type Item = io::Result<SseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut event = SseEvent::default();
        let mut has_data = false;

        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.finished = true;
                    return has_data.then_some(Ok(event));
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }

            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if has_data {
                    return Some(Ok(event));
                }
                // an event name without data is discarded
                event = SseEvent::default();
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => event.event = Some(value.to_string()),
                "data" => {
                    if has_data {
                        event.data.push('\n');
                    }
                    event.data.push_str(value);
                    has_data = true;
                }
                _ => {}
            }
        }
    }
}
