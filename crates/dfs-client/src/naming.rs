//! A file is identified by a name plus an extension suffix. The wire
//! protocol carries the two separately, so every entry point that takes a
//! single `hdfsName` string splits it here.

pub fn split_name(hdfs_name: &str) -> (&str, &str) {
    match hdfs_name.rfind('.') {
        Some(idx) if idx > 0 => (&hdfs_name[..idx], &hdfs_name[idx..]),
        _ => (hdfs_name, ""),
    }
}
