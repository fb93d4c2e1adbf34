//! Minimal RGBA PNG encoder for raster overlays.

use std::io::Write;

use anyhow::anyhow;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Encode 8-bit RGBA pixels (4 bytes per pixel, row-major) as a PNG image.
pub fn encode_rgba_png(pixels: &[u8], width: usize, height: usize) -> anyhow::Result<Vec<u8>> {
    if pixels.len() != width * height * 4 {
        return Err(anyhow!(
            "Expected {} bytes of RGBA data for a {}x{} image, got {}",
            width * height * 4,
            width,
            height,
            pixels.len()
        ));
    }
    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    let mut header = Vec::with_capacity(13);
    header.extend_from_slice(&(width as u32).to_be_bytes());
    header.extend_from_slice(&(height as u32).to_be_bytes());
    header.push(8); // bit depth
    header.push(6); // color type RGBA
    header.push(0); // compression
    header.push(0); // filter
    header.push(0); // interlace
    write_chunk(&mut png, b"IHDR", &header);

    write_chunk(&mut png, b"IDAT", &deflate_scanlines(pixels, width, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

fn deflate_scanlines(pixels: &[u8], width: usize, height: usize) -> anyhow::Result<Vec<u8>> {
    let row_len = width * 4;
    let mut raw = Vec::with_capacity(height * (row_len + 1));
    for row in pixels.chunks_exact(row_len).take(height) {
        raw.push(0); // filter type none
        raw.extend_from_slice(row);
    }
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::{encode_rgba_png, PNG_SIGNATURE};

    /// Split a PNG into (type, data) chunks, checking each CRC.
    fn chunks(png: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut chunks = Vec::new();
        let mut offset = PNG_SIGNATURE.len();
        while offset < png.len() {
            let length = u32::from_be_bytes(png[offset..offset + 4].try_into().unwrap()) as usize;
            let chunk_type = &png[offset + 4..offset + 8];
            let data = &png[offset + 8..offset + 8 + length];
            let crc = u32::from_be_bytes(
                png[offset + 8 + length..offset + 12 + length]
                    .try_into()
                    .unwrap(),
            );
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(chunk_type);
            hasher.update(data);
            assert_eq!(hasher.finalize(), crc);
            chunks.push((String::from_utf8(chunk_type.to_vec()).unwrap(), data.to_vec()));
            offset += 12 + length;
        }
        chunks
    }

    #[test]
    fn test_encode_rgba_png() {
        let pixels = vec![
            255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, //
            0, 0, 0, 0, 10, 20, 30, 40, 255, 255, 255, 255,
        ];
        let png = encode_rgba_png(&pixels, 3, 2).unwrap();
        assert_eq!(PNG_SIGNATURE, png[..8]);

        let chunks = chunks(&png);
        let types: Vec<&str> = chunks.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(vec!["IHDR", "IDAT", "IEND"], types);

        let header = &chunks[0].1;
        assert_eq!(3, u32::from_be_bytes(header[0..4].try_into().unwrap()));
        assert_eq!(2, u32::from_be_bytes(header[4..8].try_into().unwrap()));
        assert_eq!(&[8, 6, 0, 0, 0], &header[8..13]);

        let mut raw = Vec::new();
        flate2::read::ZlibDecoder::new(chunks[1].1.as_slice())
            .read_to_end(&mut raw)
            .unwrap();
        assert_eq!(2 * (1 + 3 * 4), raw.len());
        assert_eq!(0, raw[0]);
        assert_eq!(pixels[..12], raw[1..13]);
        assert_eq!(pixels[12..], raw[14..]);
    }

    #[test]
    fn test_encode_rejects_wrong_length() {
        assert!(encode_rgba_png(&[0, 0, 0], 1, 1).is_err());
    }
}
