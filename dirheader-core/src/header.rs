//! 目录页的页头。

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 文本方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    /// 从左到右。
    #[default]
    Ltr,
    /// 从右到左。
    Rtl,
}

impl TextDirection {
    /// HTML `dir` 属性使用的值。
    pub fn as_str(self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

/// 目录页使用的语言。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    /// 英语。
    #[default]
    En,
    /// 中文。
    Zh,
}

struct Strings {
    language: &'static str,
    direction: TextDirection,
    title_prefix: &'static str,
    title_suffix: &'static str,
    parent_dir: &'static str,
    name: &'static str,
    size: &'static str,
    date_modified: &'static str,
}

static EN: Strings = Strings {
    language: "en",
    direction: TextDirection::Ltr,
    title_prefix: "Index of ",
    title_suffix: "",
    parent_dir: "[parent directory]",
    name: "Name",
    size: "Size",
    date_modified: "Date Modified",
};

static ZH: Strings = Strings {
    language: "zh",
    direction: TextDirection::Ltr,
    title_prefix: "",
    title_suffix: " 的索引",
    parent_dir: "[上级目录]",
    name: "名称",
    size: "大小",
    date_modified: "修改日期",
};

impl Locale {
    /// 语言标签，例如 `en`。
    pub fn tag(self) -> &'static str {
        self.strings().language
    }

    fn strings(self) -> &'static Strings {
        match self {
            Locale::En => &EN,
            Locale::Zh => &ZH,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("en") {
            Ok(Locale::En)
        } else if s.eq_ignore_ascii_case("zh") {
            Ok(Locale::Zh)
        } else {
            Err(ParseLocaleError(s.to_owned()))
        }
    }
}

/// 无法识别的语言标签。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLocaleError(String);

impl std::fmt::Display for ParseLocaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported locale `{}`, expected `en` or `zh`", self.0)
    }
}

impl std::error::Error for ParseLocaleError {}

/// 描述整个目录页的页头。
///
/// 序列化后的字段名与页面模板以及 JSON 输出保持一致。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryHeader {
    /// 文本方向。
    #[serde(rename = "textdirection")]
    pub text_direction: TextDirection,
    /// 语言标签。
    pub language: String,
    /// 页面标题，例如 `Index of /bin/`。
    #[serde(rename = "header")]
    pub title: String,
    /// 上级目录链接的文字，仅当路径不是 `/` 时存在。
    #[serde(rename = "parentDirText", with = "empty_as_none", default)]
    pub parent_dir_text: Option<String>,
    /// “名称”列的标题。
    #[serde(rename = "headerName")]
    pub header_name: String,
    /// “大小”列的标题。
    #[serde(rename = "headerSize")]
    pub header_size: String,
    /// “修改日期”列的标题。
    #[serde(rename = "headerDateModified")]
    pub header_date_modified: String,
}

/// 根据请求路径和语言构建页头。
///
/// `path` 应当是已经清理过的绝对路径。该函数不访问文件系统。
///
/// # 例子
///
/// ```
/// use dirheader_core::{build_header, Locale};
///
/// let header = build_header("/bin/", Locale::En);
/// assert_eq!(header.title, "Index of /bin/");
/// assert_eq!(header.parent_dir_text.as_deref(), Some("[parent directory]"));
///
/// let header = build_header("/", Locale::Zh);
/// assert_eq!(header.title, "/ 的索引");
/// assert_eq!(header.parent_dir_text, None);
/// ```
pub fn build_header(path: &str, locale: Locale) -> DirectoryHeader {
    let strings = locale.strings();
    DirectoryHeader {
        text_direction: strings.direction,
        language: strings.language.to_owned(),
        title: format!("{}{path}{}", strings.title_prefix, strings.title_suffix),
        parent_dir_text: (path != "/").then(|| strings.parent_dir.to_owned()),
        header_name: strings.name.to_owned(),
        header_size: strings.size.to_owned(),
        header_date_modified: strings.date_modified.to_owned(),
    }
}

/// 缺失时序列化为空字符串，空字符串反序列化为 `None`。
mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_deref().unwrap_or_default())
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|s| !s.is_empty()))
    }
}
