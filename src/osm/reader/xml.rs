// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;
use std::str::from_utf8;

use quick_xml::events::{BytesStart, Event};

use super::model::{Feature, FeatureType, Node, Relation, RelationMember, Way};
use crate::LatLon;

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event(&mut self) -> quick_xml::Result<Event<'_>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event(&mut self) -> quick_xml::Result<Event<'_>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl Parser for BufParser<'_> {
    #[inline]
    fn read_event(&mut self) -> quick_xml::Result<Event<'_>> {
        self.0.read_event()
    }
}

/// Reader streams osm [Features](Feature) from an
/// [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML) document.
///
/// Malformed elements are logged and skipped; only errors of the XML
/// syntax itself stop the iteration.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self {
            parser: BufParser(quick_xml::Reader::from_reader(data)),
            eof: false,
        }
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    pub(super) fn from_io(reader: R) -> Self {
        Self {
            parser: IoParser(quick_xml::Reader::from_reader(reader), Vec::default()),
            eof: false,
        }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut f: Option<Feature> = None;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e));
                }
            };

            match event {
                Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => {
                        if let Some(n) = parse_node(&start) {
                            return Some(Ok(Feature::Node(n)));
                        }
                    }
                    b"tag" => {
                        if let (Some(tags), Some((k, v))) = (feature_tags(&mut f), parse_tag(&start)) {
                            tags.insert(k, v);
                        }
                    }
                    b"nd" => {
                        if let (Some(Feature::Way(w)), Some(ref_)) = (f.as_mut(), parse_ref(&start)) {
                            w.nodes.push(ref_);
                        }
                    }
                    b"member" => {
                        if let (Some(Feature::Relation(r)), Some(m)) = (f.as_mut(), parse_member(&start)) {
                            r.members.push(m);
                        }
                    }
                    _ => {}
                },

                Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => f = parse_node(&start).map(Feature::Node),
                    b"way" => {
                        f = parse_id(&start, "way").map(|id| {
                            Feature::Way(Way {
                                id,
                                nodes: Vec::default(),
                                tags: HashMap::default(),
                            })
                        })
                    }
                    b"relation" => {
                        f = parse_id(&start, "relation").map(|id| {
                            Feature::Relation(Relation {
                                id,
                                members: Vec::default(),
                                tags: HashMap::default(),
                            })
                        })
                    }
                    _ => {}
                },

                Event::End(end) => match end.local_name().as_ref() {
                    b"node" | b"way" | b"relation" => {
                        if let Some(f) = f.take() {
                            return Some(Ok(f));
                        }
                    }
                    _ => {}
                },

                Event::Eof => self.eof = true,

                _ => {}
            }
        }

        f.map(Ok)
    }
}

/// Returns the raw value of an attribute, if present.
fn attribute<'a>(start: &'a BytesStart<'_>, key: &[u8]) -> Option<std::borrow::Cow<'a, [u8]>> {
    start
        .attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .map(|a| a.value)
}

fn parse_number<T: std::str::FromStr>(start: &BytesStart<'_>, key: &[u8]) -> Option<T> {
    let raw = attribute(start, key)?;
    from_utf8(&raw).ok()?.parse().ok()
}

fn parse_id(start: &BytesStart<'_>, what: &str) -> Option<i64> {
    match parse_number::<i64>(start, b"id") {
        Some(id) if id != 0 => Some(id),
        _ => {
            log::warn!("skipping {} without a valid id", what);
            None
        }
    }
}

fn parse_node(start: &BytesStart<'_>) -> Option<Node> {
    let id = parse_id(start, "node")?;
    let lat: f64 = parse_number(start, b"lat").unwrap_or(f64::NAN);
    let lon: f64 = parse_number(start, b"lon").unwrap_or(f64::NAN);

    if lat.is_finite() && lon.is_finite() {
        Some(Node {
            id,
            position: LatLon::new(lat, lon),
        })
    } else {
        log::warn!("skipping node {} without a valid position", id);
        None
    }
}

fn parse_tag(start: &BytesStart<'_>) -> Option<(String, String)> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes().filter_map(Result::ok) {
        match attr.key.as_ref() {
            b"k" => k = attr.unescape_value().ok().map(|s| s.into_owned()),
            b"v" => v = attr.unescape_value().ok().map(|s| s.into_owned()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}

fn parse_ref(start: &BytesStart<'_>) -> Option<i64> {
    parse_number::<i64>(start, b"ref").filter(|&r| r != 0)
}

fn parse_member(start: &BytesStart<'_>) -> Option<RelationMember> {
    let ref_ = parse_ref(start)?;
    let type_ = match attribute(start, b"type")?.as_ref() {
        b"node" => FeatureType::Node,
        b"way" => FeatureType::Way,
        b"relation" => FeatureType::Relation,
        _ => return None,
    };
    let role = attribute(start, b"role")
        .and_then(|r| from_utf8(&r).ok().map(str::to_string))
        .unwrap_or_default();

    Some(RelationMember { type_, ref_, role })
}

fn feature_tags(f: &mut Option<Feature>) -> Option<&mut HashMap<String, String>> {
    match f {
        Some(Feature::Way(w)) => Some(&mut w.tags),
        Some(Feature::Relation(r)) => Some(&mut r.tags),
        _ => None,
    }
}
