pub mod build;
pub mod formats;
pub mod index;
pub mod keywords;
mod packed;
pub mod types;

pub use build::build_schema as build;
pub use index::Index;
pub use keywords::{Annotation, CoreAnnotation, Keyword};
pub use packed::{PackedSlice, PackedStr};

#[derive(Debug)]
pub struct Schema<A>
where
    A: Annotation,
{
    // Keywords of the Schema.
    pub keywords: PackedSlice<Keyword<A>>,
}

impl<A> Schema<A>
where
    A: Annotation,
{
    pub fn curi(&self) -> url::Url {
        url::Url::parse(get_curi(&self.keywords)).unwrap()
    }
}

#[inline]
pub fn get_curi<'s, A: Annotation>(keywords: &'s [Keyword<A>]) -> &'s PackedStr {
    let Some(Keyword::Id { curi, .. }) = keywords.first() else {
        panic!("Keyword::Id must be first Schema keyword");
    };
    curi
}
