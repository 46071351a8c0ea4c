use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::{Document, Node};
use serde_json::Value;

use super::properties::PropertyMap;
use super::tileset::{Tileset, TilesetImage};
use super::{LayerDefinition, MapDefinition, MapOrientation};
use crate::geom::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    MissingAttribute,
    MissingElement,
    InvalidValue,
    UnsupportedOrientation,
    UnsupportedEncoding,
    TileCountMismatch,
}

#[derive(Debug, Clone)]
pub struct MapLoadError {
    pub code: MapErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for MapLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for MapLoadError {}

/// Loads a Tiled-style TMX document with embedded tilesets and CSV layer
/// data into a `MapDefinition`.
pub fn load_tmx_map(path: &Path) -> Result<MapDefinition, MapLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| MapLoadError {
        code: MapErrorCode::ReadFile,
        message: format!("failed to read map file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    parse_tmx_document(path, &raw)
}

fn parse_tmx_document(path: &Path, raw: &str) -> Result<MapDefinition, MapLoadError> {
    let doc = Document::parse(raw).map_err(|error| {
        let pos = error.pos();
        MapLoadError {
            code: MapErrorCode::XmlMalformed,
            message: error.to_string(),
            file_path: path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(error_at_node(
            MapErrorCode::InvalidRoot,
            format!(
                "expected <map> document root, found <{}>",
                root.tag_name().name()
            ),
            path,
            &doc,
            root,
        ));
    }

    let orientation = match required_attribute(path, &doc, root, "orientation")? {
        "orthogonal" => MapOrientation::Orthogonal,
        "isometric" => MapOrientation::Isometric,
        other => {
            return Err(error_at_node(
                MapErrorCode::UnsupportedOrientation,
                format!("unsupported orientation '{other}'; allowed: orthogonal, isometric"),
                path,
                &doc,
                root,
            ))
        }
    };
    let width = required_number::<u32>(path, &doc, root, "width")?;
    let height = required_number::<u32>(path, &doc, root, "height")?;
    let tile_width = required_number::<u32>(path, &doc, root, "tilewidth")?;
    let tile_height = required_number::<u32>(path, &doc, root, "tileheight")?;
    let properties = parse_properties(path, &doc, root)?;

    let mut tilesets = Vec::new();
    let mut layers = Vec::new();
    for child in root.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "tileset" => tilesets.push(parse_tileset(path, &doc, child)?),
            "layer" => layers.push(parse_layer(path, &doc, child, width, height)?),
            _ => {}
        }
    }

    Ok(MapDefinition {
        orientation,
        width,
        height,
        tile_width,
        tile_height,
        properties,
        tilesets,
        layers,
    })
}

fn parse_tileset(
    path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<Tileset, MapLoadError> {
    if node.attribute("source").is_some() {
        return Err(error_at_node(
            MapErrorCode::InvalidValue,
            "external tilesets are not supported; embed the tileset in the map".to_string(),
            path,
            doc,
            node,
        ));
    }
    let first_gid = required_number::<u32>(path, doc, node, "firstgid")?;
    let name = node.attribute("name").unwrap_or_default().to_string();
    let tile_width = required_number::<u32>(path, doc, node, "tilewidth")?;
    let tile_height = required_number::<u32>(path, doc, node, "tileheight")?;
    let tile_count = required_number::<u32>(path, doc, node, "tilecount")?;
    let columns = required_number::<u32>(path, doc, node, "columns")?;
    let spacing = optional_number::<u32>(path, doc, node, "spacing", 0)?;
    let margin = optional_number::<u32>(path, doc, node, "margin", 0)?;

    let mut draw_offset = Vec2::ZERO;
    if let Some(offset) = child_element(node, "tileoffset") {
        draw_offset = Vec2::new(
            optional_number::<f32>(path, doc, offset, "x", 0.0)?,
            optional_number::<f32>(path, doc, offset, "y", 0.0)?,
        );
    }

    let Some(image_node) = child_element(node, "image") else {
        return Err(error_at_node(
            MapErrorCode::MissingElement,
            "tileset has no <image> element".to_string(),
            path,
            doc,
            node,
        ));
    };
    let image = TilesetImage {
        path: PathBuf::from(required_attribute(path, doc, image_node, "source")?),
        width: required_number::<u32>(path, doc, image_node, "width")?,
        height: required_number::<u32>(path, doc, image_node, "height")?,
    };

    let properties = parse_properties(path, doc, node)?;
    let mut tile_properties = std::collections::HashMap::new();
    for tile_node in node
        .children()
        .filter(|child| child.is_element() && child.tag_name().name() == "tile")
    {
        let local_id = required_number::<u32>(path, doc, tile_node, "id")?;
        let props = parse_properties(path, doc, tile_node)?;
        if !props.is_empty() {
            tile_properties.insert(local_id, props);
        }
    }

    Ok(Tileset {
        name,
        first_gid,
        tile_count,
        columns,
        tile_width,
        tile_height,
        spacing,
        margin,
        draw_offset,
        image,
        properties,
        tile_properties,
    })
}

fn parse_layer(
    path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    map_width: u32,
    map_height: u32,
) -> Result<LayerDefinition, MapLoadError> {
    let name = node.attribute("name").unwrap_or_default().to_string();
    let width = optional_number::<u32>(path, doc, node, "width", map_width)?;
    let height = optional_number::<u32>(path, doc, node, "height", map_height)?;
    let opacity = optional_number::<f32>(path, doc, node, "opacity", 1.0)?;
    let visible = optional_number::<u32>(path, doc, node, "visible", 1)? != 0;
    let offset_px = Vec2::new(
        optional_number::<f32>(path, doc, node, "offsetx", 0.0)?,
        optional_number::<f32>(path, doc, node, "offsety", 0.0)?,
    );
    let properties = parse_properties(path, doc, node)?;

    let Some(data_node) = child_element(node, "data") else {
        return Err(error_at_node(
            MapErrorCode::MissingElement,
            "layer has no <data> element".to_string(),
            path,
            doc,
            node,
        ));
    };
    let encoding = data_node.attribute("encoding").unwrap_or_default();
    if encoding != "csv" {
        return Err(error_at_node(
            MapErrorCode::UnsupportedEncoding,
            format!("unsupported layer data encoding '{encoding}'; only csv is supported"),
            path,
            doc,
            data_node,
        ));
    }
    let raw = data_node.text().unwrap_or_default();
    let mut tiles = Vec::with_capacity(width as usize * height as usize);
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let gid = entry.parse::<u32>().map_err(|_| {
            error_at_node(
                MapErrorCode::InvalidValue,
                format!("layer data entry '{entry}' is not a valid tile id"),
                path,
                doc,
                data_node,
            )
        })?;
        tiles.push(gid);
    }
    let expected = width as usize * height as usize;
    if tiles.len() != expected {
        return Err(error_at_node(
            MapErrorCode::TileCountMismatch,
            format!(
                "layer '{}' data has {} tiles, expected {}",
                name,
                tiles.len(),
                expected
            ),
            path,
            doc,
            data_node,
        ));
    }

    Ok(LayerDefinition {
        name,
        width,
        height,
        tiles,
        opacity,
        visible,
        offset_px,
        properties,
    })
}

fn parse_properties(
    path: &Path,
    doc: &Document<'_>,
    parent: Node<'_, '_>,
) -> Result<PropertyMap, MapLoadError> {
    let mut properties = PropertyMap::new();
    let Some(container) = child_element(parent, "properties") else {
        return Ok(properties);
    };
    for property in container
        .children()
        .filter(|child| child.is_element() && child.tag_name().name() == "property")
    {
        let name = required_attribute(path, doc, property, "name")?.to_string();
        let raw_value = property
            .attribute("value")
            .map(str::to_string)
            .or_else(|| property.text().map(|text| text.trim().to_string()))
            .unwrap_or_default();
        let kind = property.attribute("type").unwrap_or("string");
        let value = match kind {
            "string" => Value::String(raw_value),
            "bool" => Value::Bool(parse_scalar::<bool>(
                path, doc, property, &name, &raw_value,
            )?),
            "int" => Value::from(parse_scalar::<i64>(path, doc, property, &name, &raw_value)?),
            "float" => Value::from(parse_scalar::<f64>(
                path, doc, property, &name, &raw_value,
            )?),
            other => {
                return Err(error_at_node(
                    MapErrorCode::InvalidValue,
                    format!(
                        "property '{name}' has unsupported type '{other}'; \
                         allowed: string, bool, int, float"
                    ),
                    path,
                    doc,
                    property,
                ))
            }
        };
        properties.insert(name, value);
    }
    Ok(properties)
}

fn parse_scalar<T: FromStr>(
    path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
    raw: &str,
) -> Result<T, MapLoadError> {
    raw.parse::<T>().map_err(|_| {
        error_at_node(
            MapErrorCode::InvalidValue,
            format!("property '{name}' value '{raw}' does not match its declared type"),
            path,
            doc,
            node,
        )
    })
}

fn child_element<'a, 'input>(
    parent: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    parent
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

fn required_attribute<'a>(
    path: &Path,
    doc: &Document<'_>,
    node: Node<'a, '_>,
    name: &str,
) -> Result<&'a str, MapLoadError> {
    node.attribute(name).ok_or_else(|| {
        error_at_node(
            MapErrorCode::MissingAttribute,
            format!(
                "missing required attribute '{}' on <{}>",
                name,
                node.tag_name().name()
            ),
            path,
            doc,
            node,
        )
    })
}

fn required_number<T: FromStr>(
    path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<T, MapLoadError> {
    let raw = required_attribute(path, doc, node, name)?;
    raw.parse::<T>().map_err(|_| {
        error_at_node(
            MapErrorCode::InvalidValue,
            format!(
                "attribute '{}' value '{}' on <{}> is not a valid number",
                name,
                raw,
                node.tag_name().name()
            ),
            path,
            doc,
            node,
        )
    })
}

fn optional_number<T: FromStr>(
    path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
    default: T,
) -> Result<T, MapLoadError> {
    match node.attribute(name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            error_at_node(
                MapErrorCode::InvalidValue,
                format!(
                    "attribute '{}' value '{}' on <{}> is not a valid number",
                    name,
                    raw,
                    node.tag_name().name()
                ),
                path,
                doc,
                node,
            )
        }),
    }
}

fn error_at_node(
    code: MapErrorCode,
    message: String,
    path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> MapLoadError {
    let pos = doc.text_pos_at(node.range().start);
    MapLoadError {
        code,
        message,
        file_path: path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}
