/// ドメインサービス: サイズと転送速度のフォーマット
///
/// バイト数を 1024 を底とした単位に変換する。
/// 違反メッセージや進捗表示で使われる。

const SIZE_UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];
const SPEED_UNITS: &[&str] = &["B/s", "KB/s", "MB/s", "GB/s"];

/// ファイルサイズをフォーマット
///
/// - 0: "0 Bytes"
/// - 1536: "1.5 KB"
/// - 10485760: "10 MB"
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    format_scaled(bytes as f64, SIZE_UNITS, 2)
}

/// 転送速度 (bytes/sec) をフォーマット
///
/// - 0: "0 B/s"
/// - 2048: "2 KB/s"
pub fn format_upload_speed(bytes_per_second: f64) -> String {
    if bytes_per_second <= 0.0 || !bytes_per_second.is_finite() {
        return "0 B/s".to_string();
    }
    format_scaled(bytes_per_second, SPEED_UNITS, 1)
}

/// 値を単位系に合わせて縮約し、小数点以下の末尾ゼロを除去する
fn format_scaled(value: f64, units: &[&str], decimals: usize) -> String {
    let mut scaled = value;
    let mut exponent = 0;
    while scaled >= 1024.0 && exponent < units.len() - 1 {
        scaled /= 1024.0;
        exponent += 1;
    }

    let fixed = format!("{:.*}", decimals, scaled);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };

    format!("{} {}", trimmed, units[exponent])
}
