use serde::{Deserialize, Serialize};

use crate::entry::Row;
use crate::header::DirectoryHeader;
use crate::render::{self, Format, RenderError, Rendered};

/// 一次请求的目录列表，由页头和按名称排序的条目组成。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// 页头。
    pub header: DirectoryHeader,
    /// 按名称升序排列的条目。
    pub rows: Vec<Row>,
}

impl Listing {
    /// 使用给定的页头和条目创建目录列表。
    pub fn new(header: DirectoryHeader, rows: Vec<Row>) -> Self {
        Self { header, rows }
    }

    /// 以指定格式渲染，见 [`render::render`]。
    pub fn render(&self, format: Format) -> Result<Rendered, RenderError> {
        render::render(self, format)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::Listing;
    use crate::entry::read_rows;
    use crate::header::{build_header, Locale};
    use crate::render::Format;

    #[test]
    fn read_and_render_plain() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();
        fs::create_dir(tmp.path().join("a")).unwrap();

        let listing = Listing::new(
            build_header("/data/", Locale::En),
            read_rows(tmp.path()).unwrap(),
        );
        assert_eq!(listing.header.title, "Index of /data/");
        assert_eq!(
            listing.header.parent_dir_text.as_deref(),
            Some("[parent directory]")
        );

        let names: Vec<_> = listing.rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, ["a", "b.txt"]);

        let rendered = listing.render(Format::Plain).unwrap();
        assert_eq!(rendered.body, b"a/\nb.txt\n");
    }
}
