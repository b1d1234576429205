use std::io::Write;

use url::Url;

use crate::chain::{Next, WriterStage};
use crate::context::TransformationContext;
use crate::error::Result;
use crate::json::JsonSink;
use crate::options::{EncoderOptions, Link};
use crate::stages::LINKS_PRIORITY;

/// Writes `links` on the collection and a `self` link on every feature with an id.
#[derive(Debug, Clone)]
pub struct LinksStage {
    links: Vec<Link>,
    self_link_template: Option<String>,
    single_feature: bool,
    id: Option<String>,
}

impl LinksStage {
    pub fn new(options: &EncoderOptions) -> Self {
        Self {
            links: options.links.clone(),
            self_link_template: options.self_link_template.clone(),
            single_feature: options.single_feature,
            id: None,
        }
    }

    fn self_link(&self) -> Option<Link> {
        let template = self.self_link_template.as_ref()?;
        let id = self.id.as_ref()?;
        Some(Link::new(template.replace("{id}", &path_segment(id)), "self"))
    }
}

/// Percent-encodes `id` as a single URL path segment.
fn path_segment(id: &str) -> String {
    let mut url = match Url::parse("http://localhost/") {
        Ok(url) => url,
        Err(_) => return id.to_string(),
    };
    match url.path_segments_mut() {
        Ok(mut segments) => {
            segments.clear().push(id);
        }
        Err(()) => return id.to_string(),
    }
    url.path().trim_start_matches('/').to_string()
}

fn write_links<'a, S, I>(sink: &mut S, links: I) -> Result<()>
where
    S: JsonSink + ?Sized,
    I: IntoIterator<Item = &'a Link>,
{
    sink.field_name("links")?;
    sink.start_array()?;
    for link in links {
        sink.start_object()?;
        sink.string_field("href", &link.href)?;
        sink.string_field("rel", &link.rel)?;
        if let Some(media_type) = &link.r#type {
            sink.string_field("type", media_type)?;
        }
        if let Some(title) = &link.title {
            sink.string_field("title", title)?;
        }
        sink.end_object()?;
    }
    sink.end_array()
}

impl<W: Write> WriterStage<W> for LinksStage {
    fn name(&self) -> &'static str {
        "links"
    }

    fn priority(&self) -> i32 {
        LINKS_PRIORITY
    }

    fn on_start(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        if !self.single_feature && !self.links.is_empty() {
            write_links(&mut ctx.json, &self.links)?;
        }
        next.run(ctx)
    }

    fn on_feature_start(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        self.id = None;
        next.run(ctx)
    }

    fn on_property(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        let is_id = ctx.state.property().is_some_and(|property| property.is_id());
        if is_id && self.id.is_none() {
            self.id = ctx.state.value().map(str::to_string);
        }
        next.run(ctx)
    }

    fn on_feature_end(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        let self_link = self.self_link();
        if self.single_feature {
            if !self.links.is_empty() || self_link.is_some() {
                write_links(&mut ctx.json, self.links.iter().chain(self_link.as_ref()))?;
            }
        } else if let Some(self_link) = &self_link {
            write_links(&mut ctx.json, [self_link])?;
        }
        next.run(ctx)
    }
}
