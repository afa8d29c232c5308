//! Prints every event of a document that arrives in small, irregular
//! chunks, the way a socket or a file read loop would deliver it, while
//! starting from a deliberately undersized buffer and doubling it whenever
//! the parser asks for more room.
//!
//! The two recoverable suspensions drive the whole loop:
//!
//! * `UnexpectedEof`: the current chunk is exhausted; hand over the next
//!   one.
//! * `InsufficientMemory`: the buffer cannot hold the next byte or frame;
//!   swap in a larger one with `reallocate` and the parser resumes exactly
//!   where it stopped, reparsing the character that overran.
//!
//! Run with
//!
//! ```bash
//! cargo run -p jsonpull --example event_dump
//! ```

use jsonpull::{ErrorKind, ParseEvent, PullParser, ScalarValue};

fn main() {
    // In real life these chunks would come from the network or disk.
    let chunks: [&[u8]; 5] = [
        br#"{ "first name" : "John", "#,
        br#""last name" : "Jacob Jingl"#,
        br#"eheimer Schmidt", "age" :"#,
        br#" 30, "ratio": 0.25, "#,
        br#""car" : null }"#,
    ];

    let mut parser = PullParser::new(vec![0; 16]);
    let mut chunk = 0;
    loop {
        match parser.parse(chunks[chunk]) {
            Ok(ParseEvent::EndOfDocument) => {
                println!("document complete");
                break;
            }
            Ok(event) => print_event(&event),
            Err(e) if e.kind == ErrorKind::UnexpectedEof => {
                chunk += 1;
                if chunk == chunks.len() {
                    eprintln!("ran out of input: {e}");
                    std::process::exit(1);
                }
            }
            Err(e) if e.kind == ErrorKind::InsufficientMemory => {
                let larger = vec![0; parser.buffer_len() * 2];
                println!("  (growing buffer to {} bytes)", larger.len());
                let _old = parser
                    .reallocate(larger)
                    .expect("replacement buffer is larger");
            }
            Err(e) => {
                eprintln!("parse error: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn print_event(event: &ParseEvent<'_>) {
    let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
    let label = |name: Option<&[u8]>| match name {
        Some(n) => format!(" \"{}\"", text(n)),
        None => String::new(),
    };
    match *event {
        ParseEvent::ObjectBegin { name } => println!("object began{}", label(name)),
        ParseEvent::ObjectEnd { name } => println!("object ended{}", label(name)),
        ParseEvent::ArrayBegin { name } => println!("array began{}", label(name)),
        ParseEvent::ArrayEnd { name } => println!("array ended{}", label(name)),
        ParseEvent::Name { name } => println!("name \"{}\"", text(name)),
        ParseEvent::Value { name, value } => {
            let rendered = match value {
                ScalarValue::Integer(n) => n.to_string(),
                ScalarValue::Float(x) => format!("{x}"),
                ScalarValue::String(s) => format!("\"{}\"", text(s)),
                ScalarValue::Boolean(b) => b.to_string(),
                ScalarValue::Null => "null".to_string(),
            };
            match name {
                Some(n) => println!("value \"{}\" = {rendered}", text(n)),
                None => println!("value {rendered}"),
            }
        }
        ParseEvent::EndOfDocument => {}
    }
}
