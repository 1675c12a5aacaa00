// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading JUnit XML reports.
//!
//! Only the parts of the report that metrics are derived from are kept: the root element's
//! `name`, and for every `testcase` element its `name`, its `time`, and which status markers
//! (`failure`, `error`, `skipped`) it contains as direct children. Test cases are collected from
//! anywhere below the root, so both a bare `<testsuite>` and a `<testsuites>` wrapper work.

use crate::errors::{ReportLoadError, ReportParseError, ReportParseErrorKind};
use camino::Utf8Path;
use quick_xml::{
    Reader,
    encoding::{decode, detect_encoding},
    events::{BytesStart, Event},
};
use std::borrow::Cow;
use tracing::debug;

static NAME_ATTR: &[u8] = b"name";
static TIME_ATTR: &[u8] = b"time";
static TESTCASE_TAG: &[u8] = b"testcase";
static FAILURE_TAG: &[u8] = b"failure";
static ERROR_TAG: &[u8] = b"error";
static SKIPPED_TAG: &[u8] = b"skipped";

/// A parsed JUnit report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportDocument {
    /// The `name` attribute of the root element, if present.
    pub root_name: Option<String>,

    /// Every `testcase` element in document order.
    pub testcases: Vec<RawTestcase>,
}

impl ReportDocument {
    /// Reads and parses the report at `path`.
    pub fn from_path(path: &Utf8Path) -> Result<Self, ReportLoadError> {
        let bytes = std::fs::read(path).map_err(|err| ReportLoadError::Read {
            path: path.to_owned(),
            err,
        })?;
        let document = Self::from_bytes(&bytes).map_err(|err| ReportLoadError::Parse {
            path: path.to_owned(),
            err,
        })?;
        debug!(
            "read {} test cases from `{path}` (root name: {:?})",
            document.testcases.len(),
            document.root_name,
        );
        Ok(document)
    }

    /// Decodes and parses a report from raw bytes.
    ///
    /// The encoding comes from a byte order mark if there is one, then from the XML declaration,
    /// and is UTF-8 otherwise. Bytes that aren't valid in that encoding are a parse error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReportParseError> {
        let xml = decode_report(bytes)?;
        Self::parse(&xml)
    }

    /// Parses a report from a string.
    pub fn parse(xml: &str) -> Result<Self, ReportParseError> {
        let mut reader = Reader::from_str(xml);
        let mut document = ReportDocument::default();
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut root_state = RootState::NotSeen;

        loop {
            let position = reader.buffer_position();
            let event = reader.read_event().map_err(|err| {
                ReportParseError::new(ReportParseErrorKind::Xml(err), reader.buffer_position())
            })?;

            match event {
                Event::Start(start) => {
                    let open = document.visit_element(
                        &reader,
                        &start,
                        stack.last(),
                        &mut root_state,
                        position,
                    )?;
                    stack.push(open);
                }
                Event::Empty(start) => {
                    document.visit_element(
                        &reader,
                        &start,
                        stack.last(),
                        &mut root_state,
                        position,
                    )?;
                    if stack.is_empty() {
                        root_state = RootState::Closed;
                    }
                }
                Event::End(end) => {
                    if stack.pop().is_none() {
                        let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                        return Err(ReportParseError::new(
                            ReportParseErrorKind::UnexpectedEndTag { name },
                            position,
                        ));
                    }
                    if stack.is_empty() {
                        root_state = RootState::Closed;
                    }
                }
                Event::Eof => break,
                // Text, comments, CDATA, declarations and processing instructions carry nothing
                // we report on.
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(ReportParseError::new(
                ReportParseErrorKind::UnclosedElement { name: open.name },
                reader.buffer_position(),
            ));
        }
        if root_state == RootState::NotSeen {
            return Err(ReportParseError::new(
                ReportParseErrorKind::NoRootElement,
                reader.buffer_position(),
            ));
        }

        Ok(document)
    }

    fn visit_element(
        &mut self,
        reader: &Reader<&[u8]>,
        start: &BytesStart<'_>,
        parent: Option<&OpenElement>,
        root_state: &mut RootState,
        position: usize,
    ) -> Result<OpenElement, ReportParseError> {
        let tag = start.name();
        let tag = tag.as_ref();
        let attrs = ElementAttrs::read(reader, start)
            .map_err(|err| ReportParseError::new(ReportParseErrorKind::Xml(err), position))?;

        if parent.is_none() {
            match root_state {
                RootState::NotSeen => {
                    self.root_name = attrs.name.clone();
                    *root_state = RootState::Open;
                }
                RootState::Open => {
                    unreachable!("an open root element is always on the stack")
                }
                RootState::Closed => {
                    return Err(ReportParseError::new(
                        ReportParseErrorKind::MultipleRootElements {
                            name: String::from_utf8_lossy(tag).into_owned(),
                        },
                        position,
                    ));
                }
            }
        }

        // Status markers count only as direct children of a test case.
        if let Some(index) = parent.and_then(|parent| parent.testcase) {
            let markers = &mut self.testcases[index].markers;
            if tag == FAILURE_TAG {
                markers.failure = true;
            } else if tag == ERROR_TAG {
                markers.error = true;
            } else if tag == SKIPPED_TAG {
                markers.skipped = true;
            }
        }

        let testcase = if tag == TESTCASE_TAG {
            self.testcases.push(RawTestcase {
                name: attrs.name,
                time: attrs.time,
                markers: StatusMarkers::default(),
            });
            Some(self.testcases.len() - 1)
        } else {
            None
        };

        Ok(OpenElement {
            name: String::from_utf8_lossy(tag).into_owned(),
            testcase,
        })
    }
}

fn decode_report(bytes: &[u8]) -> Result<Cow<'_, str>, ReportParseError> {
    let detected = detect_encoding(bytes);
    let (body, encoding) = match detected {
        // UTF-16 markup can't be tokenized before it is decoded, so trust the detected encoding.
        Some((encoding, bom_len)) if bom_len > 0 || !encoding.is_ascii_compatible() => {
            (&bytes[bom_len..], encoding)
        }
        _ => {
            // The first event is the XML declaration if there is one. Reading it sets the
            // reader's encoding to the declared one.
            let mut reader = Reader::from_reader(bytes);
            reader.read_event().map_err(|err| {
                ReportParseError::new(ReportParseErrorKind::Xml(err), reader.buffer_position())
            })?;
            let declared = reader.decoder().encoding();
            match detected {
                // A declaration readable as ASCII can't be right about a UTF-16 encoding.
                Some((ascii_compatible, _)) if !declared.is_ascii_compatible() => {
                    (bytes, ascii_compatible)
                }
                _ => (bytes, declared),
            }
        }
    };

    decode(body, encoding).map_err(|_| {
        ReportParseError::new(
            ReportParseErrorKind::Undecodable {
                encoding: encoding.name(),
            },
            0,
        )
    })
}

/// A `testcase` element as it appears in the report, before classification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTestcase {
    /// The `name` attribute, if present.
    pub name: Option<String>,

    /// The `time` attribute exactly as written, if present.
    pub time: Option<String>,

    /// The status markers found as direct children.
    pub markers: StatusMarkers,
}

/// Which status marker elements a test case contains.
///
/// Marker content (messages, stack traces) is ignored; only presence matters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusMarkers {
    /// A `failure` child is present.
    pub failure: bool,

    /// An `error` child is present.
    pub error: bool,

    /// A `skipped` child is present.
    pub skipped: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RootState {
    NotSeen,
    Open,
    Closed,
}

#[derive(Debug)]
struct OpenElement {
    name: String,
    // Index into `ReportDocument::testcases` if this element is a test case.
    testcase: Option<usize>,
}

#[derive(Debug, Default)]
struct ElementAttrs {
    name: Option<String>,
    time: Option<String>,
}

impl ElementAttrs {
    // All attributes are walked, not just the interesting ones, so that a malformed attribute
    // anywhere on the element is reported.
    fn read(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> quick_xml::Result<Self> {
        let mut attrs = Self::default();
        for attr in start.attributes() {
            let attr = attr?;
            let key = attr.key.as_ref();
            if key == NAME_ATTR {
                attrs.name = Some(attr.decode_and_unescape_value(reader)?.into_owned());
            } else if key == TIME_ATTR {
                attrs.time = Some(attr.decode_and_unescape_value(reader)?.into_owned());
            }
        }
        Ok(attrs)
    }
}
