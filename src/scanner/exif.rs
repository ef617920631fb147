use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// EXIFの撮影日時を読む
///
/// DateTimeOriginal を優先し、無ければ DateTime。
/// EXIFが無い・壊れている場合は None（処理は続行する）
pub fn extract_datetime(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(file);
    let exif = exif::Reader::new()
        .read_from_container(&mut bufreader)
        .ok()?;

    [exif::Tag::DateTimeOriginal, exif::Tag::DateTime]
        .iter()
        .filter_map(|tag| exif.get_field(*tag, exif::In::PRIMARY))
        .find_map(|field| field_to_datetime(&field.value))
}

fn field_to_datetime(value: &exif::Value) -> Option<NaiveDateTime> {
    match value {
        exif::Value::Ascii(parts) => parts.first().and_then(|bytes| parse_exif_datetime(bytes)),
        _ => None,
    }
}

/// "2024:06:01 09:00:00" 形式を解釈
pub(crate) fn parse_exif_datetime(bytes: &[u8]) -> Option<NaiveDateTime> {
    let dt = exif::DateTime::from_ascii(bytes).ok()?;
    NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?.and_hms_opt(
        dt.hour.into(),
        dt.minute.into(),
        dt.second.into(),
    )
}
