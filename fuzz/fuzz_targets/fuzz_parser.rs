#![no_main]

use jsonpull::{ErrorKind, ParseEvent, PullParser};
use libfuzzer_sys::fuzz_target;

// The first two bytes steer the harness: one seeds the chunk partition, the
// other the initial buffer size. The rest is the document. Whatever the
// bytes are, the parser must never panic and must always terminate.
fn drive(data: &[u8]) {
    let [split_seed, buffer_seed, payload @ ..] = data else {
        return;
    };
    if payload.is_empty() {
        return;
    }

    let split_seed = usize::from(*split_seed);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < payload.len() {
        let remaining = payload.len() - start;
        let size = (split_seed % remaining) + 1;
        chunks.push(&payload[start..start + size]);
        start += size;
    }

    let mut parser = PullParser::new(vec![0; 1 + usize::from(*buffer_seed)]);
    let buffer_cap = payload.len() * 4 + 64;
    let mut idx = 0;
    loop {
        match parser.parse(chunks[idx]) {
            Ok(ParseEvent::EndOfDocument) => break,
            Ok(_) => {}
            Err(e) if e.kind == ErrorKind::UnexpectedEof => {
                idx += 1;
                if idx == chunks.len() {
                    break;
                }
            }
            Err(e) if e.kind == ErrorKind::InsufficientMemory => {
                let next = parser.buffer_len() * 2;
                if next > buffer_cap {
                    break;
                }
                parser
                    .reallocate(vec![0; next])
                    .expect("doubling is strictly larger");
            }
            Err(_) => break,
        }
    }
}

fuzz_target!(|data: &[u8]| drive(data));
