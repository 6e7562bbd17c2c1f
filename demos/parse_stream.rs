use std::convert::Infallible;

use bytes::Bytes;
use formstream::Multipart;
use futures_util::stream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_file_field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";

    // Feed the body in small chunks, the way a socket would deliver it.
    let chunks: Vec<_> = data
        .as_bytes()
        .chunks(16)
        .map(|chunk| Result::<Bytes, Infallible>::Ok(Bytes::copy_from_slice(chunk)))
        .collect();

    let mut multipart = Multipart::new(stream::iter(chunks), "X-BOUNDARY");

    while let Some(mut field) = multipart.next_field().await? {
        println!(
            "field {}: name={:?} filename={:?} content-type={:?}",
            field.index(),
            field.name(),
            field.file_name(),
            field.content_type()
        );

        while let Some(chunk) = field.chunk().await? {
            println!("  chunk: {} bytes", chunk.len());
        }
    }

    Ok(())
}
