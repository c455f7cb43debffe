use crate::Result;

use std::io::Cursor;

use anyhow::anyhow;
use image::ImageFormat;

const FILE_HEADER_SIZE: usize = 14;
const INFO_HEADER_SIZE: usize = 40;
const V5_HEADER_SIZE: usize = 124;

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;
const LCS_GM_GRAPHICS: u32 = 2;

/// Characters kept verbatim in a file URI path.
const URI_SAFE: &[u8] = b"-_.!~*'()/:@&=+$,";

/// UTF-8 text to the NUL-terminated UTF-16LE the platform calls
/// `CF_UNICODETEXT`. Lone line feeds become CRLF.
pub fn utf8_to_utf16(data: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(trim_nul(data))
        .map_err(|err| anyhow!("unable to decode UTF-8 text: {}", err))?;

    let mut units = Vec::with_capacity(text.len() + 1);
    let mut previous = None;

    for c in text.chars() {
        if c == '\n' && previous != Some('\r') {
            units.push('\r' as u16);
        }

        let mut buf = [0u16; 2];
        units.extend_from_slice(c.encode_utf16(&mut buf));
        previous = Some(c);
    }

    units.push(0);

    Ok(units.iter().flat_map(|unit| unit.to_le_bytes()).collect())
}

/// `CF_UNICODETEXT` back to UTF-8. Carriage returns are dropped and the
/// result stops at the first NUL.
pub fn utf16_to_utf8(data: &[u8]) -> Result<Vec<u8>> {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .filter(|&unit| unit != '\r' as u16)
        .collect();

    String::from_utf16(&units)
        .map(String::into_bytes)
        .map_err(|err| anyhow!("unable to decode UTF-16 text: {}", err))
}

/// UTF-8 text to NUL-terminated `CF_TEXT` in the Latin-1 codepage.
/// Characters outside Latin-1 become `?`.
pub fn utf8_to_latin1(data: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(trim_nul(data))
        .map_err(|err| anyhow!("unable to decode UTF-8 text: {}", err))?;

    let mut bytes = Vec::with_capacity(text.len() + 1);
    let mut previous = None;

    for c in text.chars() {
        if c == '\n' && previous != Some('\r') {
            bytes.push(b'\r');
        }

        bytes.push(if (c as u32) < 0x100 { c as u8 } else { b'?' });
        previous = Some(c);
    }

    bytes.push(0);
    Ok(bytes)
}

pub fn latin1_to_utf8(data: &[u8]) -> Vec<u8> {
    trim_nul(data)
        .iter()
        .filter(|&&byte| byte != b'\r')
        .map(|&byte| byte as char)
        .collect::<String>()
        .into_bytes()
}

fn trim_nul(data: &[u8]) -> &[u8] {
    match data.iter().position(|&byte| byte == 0) {
        Some(end) => &data[..end],
        None => data,
    }
}

fn read_u16(
    data: &[u8],
    offset: usize,
) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(
    data: &[u8],
    offset: usize,
) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn write_u32(
    data: &mut [u8],
    offset: usize,
    value: u32,
) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// A packed DIB as found under `CF_DIB` to a BMP file. Plain 32-bit
/// `BI_RGB` bitmaps carry premultiplied alpha in their padding byte; they
/// are rewritten with a V5 header declaring an alpha mask and their pixels
/// are unpremultiplied.
pub fn dib_to_bmp(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < INFO_HEADER_SIZE {
        return Err(anyhow!("DIB of {} bytes is shorter than its header", data.len()));
    }

    let header_size = read_u32(data, 0) as usize;
    let planes = read_u16(data, 12);
    let bit_count = read_u16(data, 14);
    let compression = read_u32(data, 16);
    let colors_used = read_u32(data, 32) as usize;

    if header_size < INFO_HEADER_SIZE || header_size > data.len() {
        return Err(anyhow!("DIB header size {} is invalid", header_size));
    }

    if header_size == INFO_HEADER_SIZE
        && planes == 1
        && bit_count == 32
        && compression == BI_RGB
    {
        return Ok(dib_to_alpha_bmp(data));
    }

    let palette = if colors_used == 0 && bit_count <= 8 {
        1usize << bit_count
    } else {
        colors_used
    };

    let mut offset = FILE_HEADER_SIZE + header_size + palette * 4;

    if compression == BI_BITFIELDS && bit_count >= 16 && header_size == INFO_HEADER_SIZE {
        offset += 12;
    }

    let mut bmp = Vec::with_capacity(FILE_HEADER_SIZE + data.len());
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&((FILE_HEADER_SIZE + data.len()) as u32).to_le_bytes());
    bmp.extend_from_slice(&[0u8; 4]);
    bmp.extend_from_slice(&(offset as u32).to_le_bytes());
    bmp.extend_from_slice(data);

    Ok(bmp)
}

fn dib_to_alpha_bmp(data: &[u8]) -> Vec<u8> {
    let width = read_u32(data, 4) as i32;
    let height = read_u32(data, 8) as i32;
    let pixels = &data[INFO_HEADER_SIZE..];
    let size_image = width
        .unsigned_abs()
        .saturating_mul(height.unsigned_abs())
        .saturating_mul(4);
    let total = FILE_HEADER_SIZE + V5_HEADER_SIZE + pixels.len();

    let mut bmp = vec![0u8; total];
    bmp[0..2].copy_from_slice(b"BM");
    write_u32(&mut bmp, 2, total as u32);
    write_u32(&mut bmp, 10, (FILE_HEADER_SIZE + V5_HEADER_SIZE) as u32);

    {
        let v5 = &mut bmp[FILE_HEADER_SIZE..FILE_HEADER_SIZE + V5_HEADER_SIZE];
        write_u32(v5, 0, V5_HEADER_SIZE as u32);
        write_u32(v5, 4, width as u32);
        write_u32(v5, 8, height as u32);
        v5[12..14].copy_from_slice(&1u16.to_le_bytes());
        v5[14..16].copy_from_slice(&32u16.to_le_bytes());
        write_u32(v5, 16, BI_BITFIELDS);
        write_u32(v5, 20, size_image);
        v5[24..32].copy_from_slice(&data[24..32]);
        write_u32(v5, 40, 0x00ff_0000);
        write_u32(v5, 44, 0x0000_ff00);
        write_u32(v5, 48, 0x0000_00ff);
        write_u32(v5, 52, 0xff00_0000);
        v5[56..60].copy_from_slice(b"BGRs");
        write_u32(v5, 108, LCS_GM_GRAPHICS);
    }

    let body = &mut bmp[FILE_HEADER_SIZE + V5_HEADER_SIZE..];
    body.copy_from_slice(pixels);

    let count = (size_image as usize / 4).min(body.len() / 4);
    for pixel in body.chunks_exact_mut(4).take(count) {
        let alpha = pixel[3];

        if alpha != 0 {
            let inverse = 255f64 / alpha as f64;
            for channel in &mut pixel[..3] {
                *channel = (*channel as f64 * inverse + 0.5).min(255f64) as u8;
            }
        }
    }

    bmp
}

/// A BMP file to the packed DIB stored under `CF_DIB`.
pub fn bmp_to_dib(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() <= FILE_HEADER_SIZE || &data[..2] != b"BM" {
        return Err(anyhow!("{} bytes do not form a BMP file", data.len()));
    }

    Ok(data[FILE_HEADER_SIZE..].to_vec())
}

/// Any image the codec recognizes, re-encoded as PNG.
pub fn image_to_png(data: &[u8]) -> Result<Vec<u8>> {
    encode_image(data, ImageFormat::Png)
}

/// Any image the codec recognizes, re-encoded as a packed DIB.
pub fn image_to_dib(data: &[u8]) -> Result<Vec<u8>> {
    bmp_to_dib(&encode_image(data, ImageFormat::Bmp)?)
}

/// A packed DIB decoded and re-encoded as PNG.
pub fn dib_to_png(data: &[u8]) -> Result<Vec<u8>> {
    image_to_png(&dib_to_bmp(data)?)
}

fn encode_image(
    data: &[u8],
    format: ImageFormat,
) -> Result<Vec<u8>> {
    let image = image::load_from_memory(data)
        .map_err(|err| anyhow!("unable to decode image: {}", err))?;

    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, format)
        .map_err(|err| anyhow!("unable to encode image as {:?}: {}", format, err))?;

    Ok(encoded.into_inner())
}

/// An absolute Windows path as a `file:` URI. Drive paths become
/// `file:///C:/...`, UNC paths `file://server/...`.
pub fn filename_to_uri(path: &str) -> Option<String> {
    let path = path.replace('\\', "/");

    let (host, rest) = if let Some(unc) = path.strip_prefix("//") {
        let end = unc.find('/').unwrap_or_else(|| unc.len());

        if end == 0 {
            return None;
        }

        (&unc[..end], &unc[end..])
    } else {
        let bytes = path.as_bytes();

        if bytes.len() < 2 || !bytes[0].is_ascii_alphabetic() || bytes[1] != b':' {
            return None;
        }

        ("", path.as_str())
    };

    let mut uri = String::from("file://");
    uri.push_str(host);

    if host.is_empty() {
        uri.push('/');
    }

    for &byte in rest.as_bytes() {
        if byte.is_ascii_alphanumeric() || URI_SAFE.contains(&byte) {
            uri.push(byte as char);
        } else {
            uri.push_str(&format!("%{:02X}", byte));
        }
    }

    Some(uri)
}

/// A `text/uri-list` body: every convertible path as a URI, each
/// terminated by CRLF.
pub fn uri_list<I, S>(paths: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paths
        .into_iter()
        .filter_map(|path| {
            let uri = filename_to_uri(path.as_ref());

            if uri.is_none() {
                warn!("unable to convert \"{}\" to a URI", path.as_ref());
            }

            uri
        })
        .fold(String::new(), |mut list, uri| {
            list.push_str(&uri);
            list.push_str("\r\n");
            list
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::Rgba;
    use image::RgbaImage;

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
    }

    #[test]
    fn utf8_becomes_nul_terminated_utf16() {
        let mut expected = utf16("héllo");
        expected.extend_from_slice(&[0, 0]);

        assert_eq!(utf8_to_utf16("héllo".as_bytes()).unwrap(), expected);
    }

    #[test]
    fn line_feeds_gain_carriage_returns_once() {
        let mut expected = utf16("a\r\nb\r\nc");
        expected.extend_from_slice(&[0, 0]);

        assert_eq!(utf8_to_utf16(b"a\nb\r\nc").unwrap(), expected);
        assert_eq!(utf16_to_utf8(&expected).unwrap(), b"a\nb\nc".to_vec());
    }

    #[test]
    fn utf16_stops_at_nul_and_rejects_lone_surrogates() {
        let mut data = utf16("ok");
        data.extend_from_slice(&[0, 0, b'x', 0]);
        assert_eq!(utf16_to_utf8(&data).unwrap(), b"ok".to_vec());

        assert!(utf16_to_utf8(&[0x00, 0xd8]).is_err());
    }

    #[test]
    fn latin1_replaces_what_it_cannot_represent() {
        assert_eq!(utf8_to_latin1("é€\n".as_bytes()).unwrap(), vec![0xe9, b'?', b'\r', b'\n', 0]);
        assert_eq!(latin1_to_utf8(&[0xe9, b'\r', b'\n', 0, b'z']), "é\n".as_bytes().to_vec());
    }

    #[test]
    fn dib_gains_a_file_header() {
        let mut dib = vec![0u8; INFO_HEADER_SIZE + 4];
        write_u32(&mut dib, 0, INFO_HEADER_SIZE as u32);
        write_u32(&mut dib, 4, 1);
        write_u32(&mut dib, 8, 1);
        dib[12] = 1;
        dib[14] = 24;

        let bmp = dib_to_bmp(&dib).unwrap();

        assert_eq!(&bmp[..2], b"BM");
        assert_eq!(read_u32(&bmp, 2) as usize, bmp.len());
        assert_eq!(read_u32(&bmp, 10) as usize, FILE_HEADER_SIZE + INFO_HEADER_SIZE);
        assert_eq!(bmp_to_dib(&bmp).unwrap(), dib);
    }

    #[test]
    fn premultiplied_dib_is_rewritten_with_an_alpha_mask() {
        let mut dib = vec![0u8; INFO_HEADER_SIZE + 4];
        write_u32(&mut dib, 0, INFO_HEADER_SIZE as u32);
        write_u32(&mut dib, 4, 1);
        write_u32(&mut dib, 8, 1);
        dib[12] = 1;
        dib[14] = 32;
        dib[INFO_HEADER_SIZE..].copy_from_slice(&[64, 32, 0, 128]);

        let bmp = dib_to_bmp(&dib).unwrap();
        let v5 = &bmp[FILE_HEADER_SIZE..];

        assert_eq!(bmp.len(), FILE_HEADER_SIZE + V5_HEADER_SIZE + 4);
        assert_eq!(read_u32(v5, 0) as usize, V5_HEADER_SIZE);
        assert_eq!(read_u32(v5, 16), BI_BITFIELDS);
        assert_eq!(read_u32(v5, 52), 0xff00_0000);
        assert_eq!(&v5[56..60], b"BGRs");
        assert_eq!(&bmp[FILE_HEADER_SIZE + V5_HEADER_SIZE..], &[128, 64, 0, 128]);
    }

    #[test]
    fn truncated_bitmaps_are_rejected() {
        assert!(dib_to_bmp(&[0u8; 12]).is_err());
        assert!(bmp_to_dib(b"BM").is_err());
        assert!(bmp_to_dib(&[0u8; 32]).is_err());
    }

    #[test]
    fn images_round_trip_through_dib_and_png() {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 1, Rgba([0, 0, 255, 255]));

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png).unwrap();

        let dib = image_to_dib(png.get_ref()).unwrap();
        let back = image::load_from_memory(&dib_to_png(&dib).unwrap()).unwrap().to_rgba8();

        assert_eq!(back.dimensions(), (2, 2));
        assert_eq!(back.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(back.get_pixel(1, 1), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn paths_become_file_uris() {
        assert_eq!(filename_to_uri("C:\\a.txt").as_deref(), Some("file:///C:/a.txt"));
        assert_eq!(
            filename_to_uri("\\\\server\\share\\my file.txt").as_deref(),
            Some("file://server/share/my%20file.txt")
        );
        assert_eq!(filename_to_uri("D:\\é").as_deref(), Some("file:///D:/%C3%A9"));
        assert_eq!(filename_to_uri("relative\\path"), None);
    }

    #[test]
    fn uri_lists_terminate_every_entry() {
        assert_eq!(
            uri_list(vec!["C:\\a.txt", "nowhere", "C:\\b.txt"]),
            "file:///C:/a.txt\r\nfile:///C:/b.txt\r\n"
        );
    }
}
