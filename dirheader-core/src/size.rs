//! 字节数的可读格式。

use humansize::{FormatSizeOptions, BINARY};

/// 将字节数格式化为便于阅读的字符串。
///
/// 以 1024 为进位，使用 `B`、`KiB`、`MiB` 等 IEC 单位，数值与单位之间没有空格。
/// 整数值不带小数，其余值保留一位小数。负数按 0 处理。
///
/// # 例子
///
/// ```
/// use dirheader_core::size::format_size;
///
/// assert_eq!(format_size(512), "512B");
/// assert_eq!(format_size(2048), "2KiB");
/// assert_eq!(format_size(1241141), "1.2MiB");
/// ```
pub fn format_size(size: i64) -> String {
    let options = FormatSizeOptions::from(BINARY)
        .decimal_places(1)
        .space_after_value(false);
    humansize::format_size(u64::try_from(size).unwrap_or(0), options)
}
