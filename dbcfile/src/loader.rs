use crate::DbcError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// read the complete file and decode it to a String
///
/// Decoding never fails: data that is neither UTF-32, UTF-16 nor UTF-8 is read as ISO-8859-1
pub(crate) fn load(path: &Path) -> Result<String, DbcError> {
    let mut file = File::open(path).map_err(|ioerror| DbcError::FileOpenError {
        filename: path.to_path_buf(),
        ioerror,
    })?;

    let filedata = read_data(&mut file, path)?;
    let text = decode_raw_bytes(&filedata);

    // the BOM has no meaning once the data is decoded
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => Ok(stripped.to_string()),
        None => Ok(text),
    }
}

fn read_data(file: &mut File, path: &Path) -> Result<Vec<u8>, DbcError> {
    let filesize = file
        .metadata()
        .map_err(|ioerror| DbcError::FileReadError {
            filename: path.to_path_buf(),
            ioerror,
        })?
        .len();
    let mut buffer = Vec::with_capacity(usize::try_from(filesize).unwrap_or(0));
    file.read_to_end(&mut buffer)
        .map_err(|ioerror| DbcError::FileReadError {
            filename: path.to_path_buf(),
            ioerror,
        })?;
    Ok(buffer)
}

fn decode_raw_bytes(filedata: &[u8]) -> String {
    /* a dbc file starts with a keyword or whitespace, so the first character is always basic ASCII.
    With UTF-16 and UTF-32 this shows up as nul bytes in the first code unit, which is used to guess the encoding. */
    if let Some(text) = decode_utf32(filedata) {
        return text;
    }
    if let Some(text) = decode_utf16(filedata) {
        return text;
    }
    match String::from_utf8(filedata.to_vec()) {
        Ok(text) => text,
        // every sequence of bytes is valid ISO-8859-1
        Err(_) => filedata.iter().map(|&byte| byte as char).collect(),
    }
}

fn decode_utf32(filedata: &[u8]) -> Option<String> {
    if filedata.len() % 4 != 0 || filedata.len() < 4 {
        return None;
    }
    // Big endian: 00 00 FE FF (BOM) or 00 00 00 xx; little endian: FF FE 00 00 (BOM) or xx 00 00 00
    let conversion: fn([u8; 4]) -> u32 =
        if filedata[0] == 0 && filedata[1] == 0 && filedata[3] != 0 {
            u32::from_be_bytes
        } else if filedata[0] != 0 && filedata[2] == 0 && filedata[3] == 0 {
            u32::from_le_bytes
        } else {
            return None;
        };

    filedata
        .chunks_exact(4)
        .map(|chunk| char::from_u32(conversion([chunk[0], chunk[1], chunk[2], chunk[3]])))
        .collect()
}

fn decode_utf16(filedata: &[u8]) -> Option<String> {
    if filedata.len() % 2 != 0 || filedata.len() < 2 {
        return None;
    }
    // Big endian: FE FF (BOM) or 00 xx; little endian: FF FE (BOM) or xx 00
    let conversion: fn([u8; 2]) -> u16 = if (filedata[0] == 0 && filedata[1] != 0)
        || (filedata[0] == 0xfe && filedata[1] == 0xff)
    {
        u16::from_be_bytes
    } else if (filedata[0] != 0 && filedata[1] == 0)
        || (filedata[0] == 0xff && filedata[1] == 0xfe)
    {
        u16::from_le_bytes
    } else {
        return None;
    };

    let units: Vec<u16> = filedata
        .chunks_exact(2)
        .map(|chunk| conversion([chunk[0], chunk[1]]))
        .collect();
    // unpaired surrogates are replaced instead of rejecting the whole file
    Some(String::from_utf16_lossy(&units))
}

/*************************************************************************************************/
