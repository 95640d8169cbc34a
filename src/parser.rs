use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{ParseError, UserInputError};
use crate::track::{Point, Track};

type Result<T> = std::result::Result<T, ParseError>;

/// Everything collected while walking the document.
#[derive(Default)]
struct Collected {
    saw_root: bool,
    segment_count: usize,
    segments: Vec<Vec<Point>>,
    name: Option<String>,
    dropped: usize,
}

/// Reject an upload before reading it: nothing chosen, or not a `.gpx` file.
pub fn check_upload(file_name: Option<&str>) -> std::result::Result<(), UserInputError> {
    let name = match file_name.map(str::trim) {
        None | Some("") => return Err(UserInputError::NoFile),
        Some(name) => name,
    };
    if name.to_ascii_lowercase().ends_with(".gpx") {
        Ok(())
    } else {
        Err(UserInputError::UnsupportedFile {
            name: name.to_string(),
        })
    }
}

/// Parse a GPX XML string into a flat [`Track`].
///
/// Track points with missing or non-finite coordinates are dropped. The
/// document must contain at least one `<trkseg>` and one valid point.
pub fn parse_gpx(xml: &str) -> Result<Track> {
    let mut reader = Reader::from_str(xml);
    let mut acc = Collected::default();
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trk" => parse_track(&mut reader, &mut acc)?,
                b"trkseg" => parse_segment(&mut reader, &mut acc)?,
                b"gpx" => {
                    acc.saw_root = true;
                    depth += 1;
                }
                _ => depth += 1,
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"gpx" => acc.saw_root = true,
                b"trkseg" => acc.segment_count += 1,
                _ => {}
            },
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ParseError::Truncated { element: "gpx" });
    }
    if !acc.saw_root {
        return Err(ParseError::NotGpx);
    }
    if acc.segment_count == 0 {
        return Err(ParseError::NoTrackData);
    }
    if acc.dropped > 0 {
        warn!("dropped {} track points with invalid coordinates", acc.dropped);
    }

    let Collected {
        segments,
        name,
        segment_count,
        ..
    } = acc;
    let track = Track::from_segments(segments).ok_or(ParseError::NoValidPoints)?;
    debug!(
        "parsed {} points from {} segments",
        track.len(),
        segment_count
    );
    Ok(track.with_name(name))
}

/// Parse a coordinate attribute, rejecting anything that is not a finite number.
fn parse_coord(raw: &[u8]) -> Option<f64> {
    std::str::from_utf8(raw)
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Read `(lon, lat)` from a `<trkpt>` start tag.
/// `Ok(None)` means the point is unusable and should be dropped.
fn parse_lon_lat(e: &BytesStart<'_>) -> Result<Option<(f64, f64)>> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| ParseError::Xml(e.into()))?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = parse_coord(&attr.value),
            b"lon" => lon = parse_coord(&attr.value),
            _ => {}
        }
    }

    Ok(lon.zip(lat))
}

/// Parse a `<trkpt>` and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(start: &BytesStart<'a>, reader: &mut Reader<&'a [u8]>) -> Result<Option<Point>> {
    let Some((lon, lat)) = parse_lon_lat(start)? else {
        reader.read_to_end(start.name()).map_err(ParseError::Xml)?;
        return Ok(None);
    };

    let mut point = Point::new(lon, lat);
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = reader.read_text(e.name()).map_err(ParseError::Xml)?;
                    point.ele = text.trim().parse::<f64>().ok().filter(|v| v.is_finite());
                }
                _ => {
                    // time, extensions and the rest are not part of the track model
                    reader.read_to_end(e.name()).map_err(ParseError::Xml)?;
                }
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => return Err(ParseError::Truncated { element: "trkpt" }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(Some(point))
}

/// Parse a `<trk>` element.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>, acc: &mut Collected) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => {
                    let name = read_text_owned(reader, &e)?;
                    if acc.name.is_none() && !name.trim().is_empty() {
                        acc.name = Some(name.trim().to_string());
                    }
                }
                b"trkseg" => parse_segment(reader, acc)?,
                _ => {
                    reader.read_to_end(e.name()).map_err(ParseError::Xml)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkseg" {
                    acc.segment_count += 1;
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => return Err(ParseError::Truncated { element: "trk" }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(())
}

/// Parse a `<trkseg>` element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>, acc: &mut Collected) -> Result<()> {
    acc.segment_count += 1;
    let mut points = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => match parse_point(&e, reader)? {
                    Some(pt) => points.push(pt),
                    None => acc.dropped += 1,
                },
                _ => {
                    reader.read_to_end(e.name()).map_err(ParseError::Xml)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    match parse_lon_lat(&e)? {
                        Some((lon, lat)) => points.push(Point::new(lon, lat)),
                        None => acc.dropped += 1,
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => return Err(ParseError::Truncated { element: "trkseg" }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    acc.segments.push(points);
    Ok(())
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Ok(Event::CData(e)) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Ok(Event::GeneralRef(e)) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => return Err(ParseError::Truncated { element: "name" }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(text)
}
