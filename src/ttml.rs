/*!
 * Markup subtitle codec (`.ttml`).
 *
 * Reads the `tt` document model: an optional document `frameRate`, named
 * styles (`head>styling>style`) and regions (`head>layout>region`), and one
 * caption per `body>div>p`. Timing attributes accept `HH:MM:SS.mmm` or
 * `HH:MM:SS:fff` where `fff` counts frames at the document frame rate.
 *
 * Style and region references are resolved once, while reading, into shared
 * `Arc` handles. A style's parent is followed one level only.
 */

use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Write};
use std::sync::Arc;

use chrono::Duration;
use log::{debug, trace};
use once_cell::sync::Lazy;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;

use crate::duration::{TTML_FRACTION_SEPARATOR, format_duration, parse_duration};
use crate::errors::{ParseError, Result, SubtitleError};
use crate::subtitles::{Line, Region, Style, Subtitle, SubtitleCodec, Subtitles, Text};

const TTML_NAMESPACE: &str = "http://www.w3.org/ns/ttml";
const DEFAULT_INDENT: usize = 4;

// @const: Attribute prefixes declared on the written root, with their namespaces
const DECLARED_PREFIXES: [(&str, &str); 3] = [
    ("tts", "http://www.w3.org/ns/ttml#styling"),
    ("ttp", "http://www.w3.org/ns/ttml#parameter"),
    ("ttm", "http://www.w3.org/ns/ttml#metadata"),
];

// @const: Frame-suffixed clock value (HH:MM:SS:fff)
static FRAMES_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+:\d+:\d+):(\d+)$").unwrap());

/// Codec value for the markup format
#[derive(Debug, Clone, Copy)]
pub struct Ttml {
    indent: usize,
}

impl Default for Ttml {
    fn default() -> Self {
        Ttml { indent: DEFAULT_INDENT }
    }
}

impl Ttml {
    /// Codec writing with `indent` spaces per nesting level
    pub fn with_indent(indent: usize) -> Self {
        Ttml { indent }
    }
}

impl SubtitleCodec for Ttml {
    fn read<R: BufRead>(&self, reader: R) -> Result<Subtitles> {
        read(reader)
    }

    fn write<W: Write>(&self, subtitles: &Subtitles, writer: W) -> Result<()> {
        write_indented(subtitles, writer, self.indent)
    }
}

/// Timing attribute value before the document frame rate is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtmlDuration {
    /// Clock part, truncated to whole seconds when a frame count is present
    pub base: Duration,
    /// Trailing frame count, zero for the fractional form
    pub frames: u32,
}

impl TtmlDuration {
    /// Parses `HH:MM:SS.mmm` or `HH:MM:SS:fff`
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        if let Some(caps) = FRAMES_REGEX.captures(text) {
            let frames = caps[2].parse::<u32>().map_err(|_| ParseError::InvalidComponent {
                input: text.to_string(),
                component: "frames",
                value: caps[2].to_string(),
            })?;
            let base = parse_duration(&format!("{}.000", &caps[1]), TTML_FRACTION_SEPARATOR)?;
            return Ok(TtmlDuration { base, frames });
        }
        Ok(TtmlDuration {
            base: parse_duration(text, TTML_FRACTION_SEPARATOR)?,
            frames: 0,
        })
    }

    /// Offset on the timeline; frames are dropped when no frame rate is known
    pub fn resolve(self, framerate: Option<u32>) -> Result<Duration, ParseError> {
        match framerate {
            Some(rate) if rate > 0 && self.frames > 0 => {
                let nanos = i64::from(self.frames) * 1_000_000_000 / i64::from(rate);
                self.base.checked_add(&Duration::nanoseconds(nanos)).ok_or_else(|| {
                    ParseError::OutOfRange(format!(
                        "{} plus {} frames at {} fps",
                        format_duration(self.base, TTML_FRACTION_SEPARATOR),
                        self.frames,
                        rate
                    ))
                })
            }
            _ => Ok(self.base),
        }
    }
}

// Attributes shared by style and region definitions
#[derive(Debug, Default)]
struct Header {
    id: String,
    style: Option<String>,
    attributes: BTreeMap<String, String>,
}

#[derive(Debug)]
struct Paragraph {
    begin: TtmlDuration,
    end: TtmlDuration,
    region: Option<String>,
    style: Option<String>,
    attributes: BTreeMap<String, String>,
    runs: Vec<Text>,
}

#[derive(Debug, Default)]
struct Document {
    framerate: Option<u32>,
    styles: Vec<Header>,
    regions: Vec<Header>,
    paragraphs: Vec<Paragraph>,
}

/// Parses a markup document into subtitles
pub fn read<R: BufRead>(reader: R) -> Result<Subtitles> {
    let document = parse_document(reader)?;

    let styles = resolve_styles(&document.styles)?;
    let regions = resolve_regions(&document.regions, &styles)?;

    let mut subtitles = Subtitles::default();
    for (index, paragraph) in document.paragraphs.into_iter().enumerate() {
        let subtitle = build_subtitle(index + 1, paragraph, document.framerate, &styles, &regions)?;
        subtitles.regions |= subtitle.region.is_some();
        subtitles.styles |= subtitle.style.is_some();
        subtitles.items.push(subtitle);
    }

    debug!(
        "Parsed {} markup captions ({} styles, {} regions, frame rate {:?})",
        subtitles.items.len(),
        styles.len(),
        regions.len(),
        document.framerate
    );
    Ok(subtitles)
}

fn parse_document<R: BufRead>(input: R) -> Result<Document> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut document = Document::default();
    let mut path: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();

        match event {
            Event::Start(e) if path.is_empty() => {
                open_root(&mut document, &mut seen_root, &e, reader.decoder())?;
                path.push(element_name(&e));
            }
            Event::Empty(e) if path.is_empty() => {
                open_root(&mut document, &mut seen_root, &e, reader.decoder())?;
            }
            Event::Start(e) => {
                let name = element_name(&e);
                match (path.last().map(String::as_str), name.as_str()) {
                    (Some("styling"), "style") => {
                        document.styles.push(parse_header(&e, reader.decoder())?);
                        skip_element(&mut reader, &e)?;
                    }
                    (Some("layout"), "region") => {
                        document.regions.push(parse_header(&e, reader.decoder())?);
                        skip_element(&mut reader, &e)?;
                    }
                    (Some("div"), "p") => {
                        let position = document.paragraphs.len() + 1;
                        let mut paragraph = parse_paragraph(position, &e, reader.decoder())?;
                        paragraph.runs = parse_runs(&mut reader)?;
                        document.paragraphs.push(paragraph);
                    }
                    _ => path.push(name),
                }
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                match (path.last().map(String::as_str), name.as_str()) {
                    (Some("styling"), "style") => document.styles.push(parse_header(&e, reader.decoder())?),
                    (Some("layout"), "region") => document.regions.push(parse_header(&e, reader.decoder())?),
                    (Some("div"), "p") => {
                        let position = document.paragraphs.len() + 1;
                        document.paragraphs.push(parse_paragraph(position, &e, reader.decoder())?);
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(xml_error("missing <tt> root element"));
    }
    if let Some(open) = path.last() {
        return Err(xml_error(format!("unexpected end of document inside <{}>", open)));
    }
    Ok(document)
}

fn open_root(document: &mut Document, seen_root: &mut bool, e: &BytesStart<'_>, decoder: Decoder) -> Result<()> {
    let name = element_name(e);
    if *seen_root || name != "tt" {
        return Err(xml_error(format!("expected a single <tt> root element, found <{}>", name)));
    }
    *seen_root = true;
    document.framerate = parse_framerate(e, decoder)?;
    Ok(())
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

fn xml_error(message: impl Into<String>) -> SubtitleError {
    ParseError::Xml(message.into()).into()
}

fn skip_element<R: BufRead>(reader: &mut Reader<R>, e: &BytesStart<'_>) -> Result<()> {
    let mut skip_buf = Vec::new();
    reader.read_to_end_into(e.name(), &mut skip_buf)?;
    Ok(())
}

/// Decoded attributes as (local name, qualified name, value), namespace declarations dropped
fn attributes(e: &BytesStart<'_>, decoder: Decoder) -> Result<Vec<(String, String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let qualified = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        if qualified == "xmlns" || qualified.starts_with("xmlns:") {
            continue;
        }
        let local = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_lowercase();
        let value = attr.decode_and_unescape_value(decoder)?.to_string();
        out.push((local, qualified, value));
    }
    Ok(out)
}

fn parse_framerate(e: &BytesStart<'_>, decoder: Decoder) -> Result<Option<u32>> {
    for (local, _, value) in attributes(e, decoder)? {
        if local == "framerate" {
            let rate = value.trim().parse::<u32>().map_err(|_| ParseError::InvalidAttribute {
                attribute: "frameRate",
                value: value.clone(),
            })?;
            return Ok(Some(rate).filter(|r| *r > 0));
        }
    }
    Ok(None)
}

fn parse_header(e: &BytesStart<'_>, decoder: Decoder) -> Result<Header> {
    let header = attributes(e, decoder)?
        .into_iter()
        .fold(Header::default(), |mut header, (local, qualified, value)| {
            match local.as_str() {
                "id" => header.id = value,
                "style" => header.style = Some(value),
                _ => {
                    header.attributes.insert(qualified, value);
                }
            }
            header
        });
    Ok(header)
}

// @returns: Where a paragraph attribute sits, for error messages
fn paragraph_location(position: usize, attribute: &str) -> String {
    format!("{} of paragraph {}", attribute, position)
}

fn parse_paragraph(position: usize, e: &BytesStart<'_>, decoder: Decoder) -> Result<Paragraph> {
    let mut begin = None;
    let mut end = None;
    let mut region = None;
    let mut style = None;
    let mut extra = BTreeMap::new();

    for (local, qualified, value) in attributes(e, decoder)? {
        match local.as_str() {
            "begin" | "end" => {
                let timing = TtmlDuration::parse(&value)
                    .map_err(|err| err.at(paragraph_location(position, &local)))?;
                if local == "begin" {
                    begin = Some(timing);
                } else {
                    end = Some(timing);
                }
            }
            "id" => {}
            "region" => region = Some(value),
            "style" => style = Some(value),
            _ => {
                extra.insert(qualified, value);
            }
        }
    }

    let missing = |attribute| {
        ParseError::MissingAttribute {
            element: "p".to_string(),
            attribute,
        }
        .at(format!("paragraph {}", position))
    };
    Ok(Paragraph {
        begin: begin.ok_or_else(|| missing("begin"))?,
        end: end.ok_or_else(|| missing("end"))?,
        region,
        style,
        attributes: extra,
        runs: Vec::new(),
    })
}

/// Reads paragraph content up to its closing tag
fn parse_runs<R: BufRead>(reader: &mut Reader<R>) -> Result<Vec<Text>> {
    let mut runs = Vec::new();
    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();
        match event {
            Event::Start(e) => {
                let mut run = styled_run(&e, reader.decoder())?;
                run.sentence = collect_text(reader)?;
                runs.push(run);
            }
            Event::Empty(e) => runs.push(styled_run(&e, reader.decoder())?),
            Event::Text(t) => {
                let text = t.unescape()?;
                let text = text.trim();
                if !text.is_empty() {
                    runs.push(Text::new(text));
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).trim().to_string();
                if !text.is_empty() {
                    runs.push(Text::new(text));
                }
            }
            Event::End(_) => return Ok(runs),
            Event::Eof => return Err(xml_error("unexpected end of document inside <p>")),
            _ => {}
        }
    }
}

fn styled_run(e: &BytesStart<'_>, decoder: Decoder) -> Result<Text> {
    let styles = attributes(e, decoder)?
        .into_iter()
        .map(|(_, qualified, value)| (qualified, value))
        .collect();
    Ok(Text {
        sentence: String::new(),
        styles,
        kind: Some(element_name(e)),
    })
}

/// Concatenates the non-blank text nested in the element just opened
fn collect_text<R: BufRead>(reader: &mut Reader<R>) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(parts.join(" ")),
            Event::End(_) => depth -= 1,
            Event::Text(t) => {
                let text = t.unescape()?;
                let text = text.trim();
                if !text.is_empty() {
                    parts.push(text.to_string());
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).trim().to_string();
                if !text.is_empty() {
                    parts.push(text);
                }
            }
            Event::Eof => return Err(xml_error("unexpected end of document inside inline element")),
            _ => {}
        }
    }
}

fn resolve_styles(headers: &[Header]) -> Result<HashMap<String, Arc<Style>>> {
    let bases: HashMap<&str, Arc<Style>> = headers
        .iter()
        .map(|h| {
            let style = Style {
                id: h.id.clone(),
                attributes: h.attributes.clone(),
                parent: None,
            };
            (h.id.as_str(), Arc::new(style))
        })
        .collect();

    headers
        .iter()
        .map(|h| -> Result<(String, Arc<Style>)> {
            let parent = match &h.style {
                Some(parent_id) => Some(bases.get(parent_id.as_str()).cloned().ok_or_else(|| {
                    ParseError::UnknownStyle {
                        id: parent_id.clone(),
                        owner: format!("style ID {}", h.id),
                    }
                })?),
                None => None,
            };
            let style = Style {
                id: h.id.clone(),
                attributes: h.attributes.clone(),
                parent,
            };
            Ok((h.id.clone(), Arc::new(style)))
        })
        .collect()
}

fn resolve_regions(
    headers: &[Header],
    styles: &HashMap<String, Arc<Style>>,
) -> Result<HashMap<String, Arc<Region>>> {
    headers
        .iter()
        .map(|h| -> Result<(String, Arc<Region>)> {
            let style = match &h.style {
                Some(style_id) => Some(styles.get(style_id).cloned().ok_or_else(|| ParseError::UnknownStyle {
                    id: style_id.clone(),
                    owner: format!("region ID {}", h.id),
                })?),
                None => None,
            };
            let region = Region {
                id: h.id.clone(),
                attributes: h.attributes.clone(),
                style,
            };
            Ok((h.id.clone(), Arc::new(region)))
        })
        .collect()
}

fn build_subtitle(
    position: usize,
    paragraph: Paragraph,
    framerate: Option<u32>,
    styles: &HashMap<String, Arc<Style>>,
    regions: &HashMap<String, Arc<Region>>,
) -> Result<Subtitle> {
    let start_at = paragraph
        .begin
        .resolve(framerate)
        .map_err(|e| e.at(paragraph_location(position, "begin")))?;
    let end_at = paragraph
        .end
        .resolve(framerate)
        .map_err(|e| e.at(paragraph_location(position, "end")))?;
    let owner = || {
        format!(
            "subtitle between {} and {}",
            format_duration(start_at, TTML_FRACTION_SEPARATOR),
            format_duration(end_at, TTML_FRACTION_SEPARATOR)
        )
    };
    if end_at < start_at {
        return Err(ParseError::InvalidAttribute {
            attribute: "end",
            value: format_duration(end_at, TTML_FRACTION_SEPARATOR),
        }
        .at(format!("paragraph {}", position))
        .into());
    }

    let region = match &paragraph.region {
        Some(id) => Some(regions.get(id).cloned().ok_or_else(|| ParseError::UnknownRegion {
            id: id.clone(),
            owner: owner(),
        })?),
        None => None,
    };
    let style = match &paragraph.style {
        Some(id) => Some(styles.get(id).cloned().ok_or_else(|| ParseError::UnknownStyle {
            id: id.clone(),
            owner: owner(),
        })?),
        None => None,
    };

    let lines = if paragraph.runs.is_empty() {
        Vec::new()
    } else {
        paragraph.runs.into_iter().fold(vec![Line::default()], |mut lines, run| {
            if run.is_line_break() {
                lines.push(Line::default());
            } else if let Some(line) = lines.last_mut() {
                line.items.push(run);
            }
            lines
        })
    };

    Ok(Subtitle {
        start_at,
        end_at,
        lines,
        region,
        style,
        inline_styles: paragraph.attributes,
    })
}

/// Serializes subtitles as a markup document with the default indentation
pub fn write<W: Write>(subtitles: &Subtitles, writer: W) -> Result<()> {
    write_indented(subtitles, writer, DEFAULT_INDENT)
}

fn write_indented<W: Write>(subtitles: &Subtitles, writer: W, indent: usize) -> Result<()> {
    subtitles.check_writable()?;

    let mut xml = Writer::new_with_indent(writer, b' ', indent);
    emit(&mut xml, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("tt");
    root.push_attribute(("xmlns", TTML_NAMESPACE));
    for (prefix, namespace) in DECLARED_PREFIXES {
        root.push_attribute((format!("xmlns:{}", prefix).as_str(), namespace));
    }
    emit(&mut xml, Event::Start(root))?;

    write_head(&mut xml, subtitles)?;

    emit(&mut xml, Event::Start(BytesStart::new("body")))?;
    emit(&mut xml, Event::Start(BytesStart::new("div")))?;
    for subtitle in &subtitles.items {
        write_paragraph(&mut xml, subtitle)?;
    }
    emit(&mut xml, Event::End(BytesEnd::new("div")))?;
    emit(&mut xml, Event::End(BytesEnd::new("body")))?;
    emit(&mut xml, Event::End(BytesEnd::new("tt")))?;

    xml.into_inner()
        .flush()
        .map_err(|e| SubtitleError::io("writing markup subtitles", e))
}

fn emit<W: Write>(xml: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    xml.write_event(event)
        .map_err(|e| SubtitleError::io("writing markup subtitles", std::io::Error::other(e)))
}

/// Styles and regions referenced by the captions, parents included
fn collect_definitions(
    subtitles: &Subtitles,
) -> (BTreeMap<String, Arc<Style>>, BTreeMap<String, Arc<Region>>) {
    fn add_style(styles: &mut BTreeMap<String, Arc<Style>>, style: &Arc<Style>) {
        if let Some(parent) = &style.parent {
            styles.entry(parent.id.clone()).or_insert_with(|| parent.clone());
        }
        styles.entry(style.id.clone()).or_insert_with(|| style.clone());
    }

    let mut styles = BTreeMap::new();
    let mut regions = BTreeMap::new();
    for subtitle in &subtitles.items {
        if let Some(style) = &subtitle.style {
            add_style(&mut styles, style);
        }
        if let Some(region) = &subtitle.region {
            if let Some(style) = &region.style {
                add_style(&mut styles, style);
            }
            regions.entry(region.id.clone()).or_insert_with(|| region.clone());
        }
    }
    (styles, regions)
}

fn header_element<'a>(
    name: &'a str,
    id: &'a str,
    style: Option<&'a str>,
    attributes: &'a BTreeMap<String, String>,
) -> BytesStart<'a> {
    let mut element = BytesStart::new(name);
    element.push_attribute(("xml:id", id));
    if let Some(style) = style {
        element.push_attribute(("style", style));
    }
    push_attributes(&mut element, attributes);
    element
}

// Attributes whose prefix the written root declares; others are dropped
fn push_attributes(element: &mut BytesStart<'_>, attributes: &BTreeMap<String, String>) {
    for (key, value) in attributes {
        let declared = match key.split_once(':') {
            None => true,
            Some((prefix, _)) => prefix == "xml" || DECLARED_PREFIXES.iter().any(|(known, _)| *known == prefix),
        };
        if declared {
            element.push_attribute((key.as_str(), value.as_str()));
        } else {
            trace!("Dropping attribute {} with an undeclared prefix", key);
        }
    }
}

fn write_head<W: Write>(xml: &mut Writer<W>, subtitles: &Subtitles) -> Result<()> {
    let (styles, regions) = collect_definitions(subtitles);
    if styles.is_empty() && regions.is_empty() {
        return Ok(());
    }

    emit(xml, Event::Start(BytesStart::new("head")))?;
    if !styles.is_empty() {
        emit(xml, Event::Start(BytesStart::new("styling")))?;
        for style in styles.values() {
            let parent = style.parent.as_ref().map(|p| p.id.as_str());
            emit(xml, Event::Empty(header_element("style", &style.id, parent, &style.attributes)))?;
        }
        emit(xml, Event::End(BytesEnd::new("styling")))?;
    }
    if !regions.is_empty() {
        emit(xml, Event::Start(BytesStart::new("layout")))?;
        for region in regions.values() {
            let style = region.style.as_ref().map(|s| s.id.as_str());
            emit(xml, Event::Empty(header_element("region", &region.id, style, &region.attributes)))?;
        }
        emit(xml, Event::End(BytesEnd::new("layout")))?;
    }
    emit(xml, Event::End(BytesEnd::new("head")))
}

fn write_paragraph<W: Write>(xml: &mut Writer<W>, subtitle: &Subtitle) -> Result<()> {
    let begin = format_duration(subtitle.start_at, TTML_FRACTION_SEPARATOR);
    let end = format_duration(subtitle.end_at, TTML_FRACTION_SEPARATOR);

    let mut p = BytesStart::new("p");
    p.push_attribute(("begin", begin.as_str()));
    p.push_attribute(("end", end.as_str()));
    if let Some(region) = &subtitle.region {
        p.push_attribute(("region", region.id.as_str()));
    }
    if let Some(style) = &subtitle.style {
        p.push_attribute(("style", style.id.as_str()));
    }
    push_attributes(&mut p, &subtitle.inline_styles);

    if subtitle.lines.iter().all(Line::is_empty) && subtitle.lines.len() <= 1 {
        return emit(xml, Event::Empty(p));
    }

    emit(xml, Event::Start(p))?;
    for (index, line) in subtitle.lines.iter().enumerate() {
        if index > 0 {
            emit(xml, Event::Empty(BytesStart::new("br")))?;
        }
        for (position, run) in line.items.iter().enumerate() {
            if position > 0 {
                emit(xml, Event::Text(BytesText::new(" ")))?;
            }
            write_run(xml, run)?;
        }
    }
    emit(xml, Event::End(BytesEnd::new("p")))
}

fn write_run<W: Write>(xml: &mut Writer<W>, run: &Text) -> Result<()> {
    if run.kind.is_none() && run.styles.is_empty() {
        return emit(xml, Event::Text(BytesText::new(&run.sentence)));
    }

    let name = run.kind.as_deref().unwrap_or("span");
    let mut element = BytesStart::new(name);
    push_attributes(&mut element, &run.styles);
    emit(xml, Event::Start(element))?;
    emit(xml, Event::Text(BytesText::new(&run.sentence)))?;
    emit(xml, Event::End(BytesEnd::new(name)))
}
