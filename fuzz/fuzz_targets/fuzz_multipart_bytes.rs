#![no_main]

use std::convert::Infallible;

use formstream::bytes::Bytes;
use formstream::{Multipart, ParserConfig};
use futures_util::stream;
use libfuzzer_sys::fuzz_target;
use tokio::runtime;

fuzz_target!(|data: &[u8]| {
    // Split the input in two so the boundary scanner also sees tokens cut
    // mid-chunk, not just whole-body delivery.
    let split = data.len() / 2;
    let chunks = [
        Result::<Bytes, Infallible>::Ok(Bytes::copy_from_slice(&data[..split])),
        Ok(Bytes::copy_from_slice(&data[split..])),
    ];

    let config = ParserConfig::new()
        .max_header_size(1024)
        .max_file_size(64 * 1024);
    let mut multipart = Multipart::with_config(stream::iter(chunks), "X-BOUNDARY", config);

    let rt = runtime::Builder::new_current_thread().build().expect("runtime");
    rt.block_on(async {
        // end of stream and failures are both terminal, one strike is enough
        loop {
            match multipart.next_field().await {
                Ok(Some(field)) => {
                    let _ = field.text().await;
                }
                Ok(None) | Err(_) => break,
            }
        }
    });
});
