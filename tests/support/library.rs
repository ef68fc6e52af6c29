use axum_boot::prelude::*;

pub const CLASSICS: &str = "四大名著";

#[derive(Clone, Debug, PartialEq)]
pub struct Book {
    pub title: &'static str,
    pub author: &'static str,
}

/// Declares the classics bean. Living in its own file, it is scheduled under a
/// different origin than the test that calls it.
pub fn declare_classics(ctx: &BootContext) -> Result<()> {
    ctx.bean(
        Bean::new(|_| {
            Ok(vec![
                Book {
                    title: "西游记",
                    author: "吴承恩",
                },
                Book {
                    title: "水浒传",
                    author: "施耐庵",
                },
                Book {
                    title: "三国演义",
                    author: "罗贯中",
                },
                Book {
                    title: "红楼梦",
                    author: "曹雪芹",
                },
            ])
        })
        .named(CLASSICS),
    )
}
