use crate::platform::DisplayPlatform;

use std::collections::HashMap;

use strum::EnumIter;
use strum::IntoEnumIterator;

pub type Atom = u32;
pub type Format = u32;

pub const NONE: Atom = 0;

pub const CF_TEXT: Format = 1;
pub const CF_BITMAP: Format = 2;
pub const CF_DIB: Format = 8;
pub const CF_UNICODETEXT: Format = 13;
pub const CF_HDROP: Format = 15;
pub const CF_LOCALE: Format = 16;
pub const CF_DIBV5: Format = 17;

/// Formats registered by name start here; everything below is predefined.
pub const FIRST_REGISTERED_FORMAT: Format = 0xc000;

pub fn predefined_format_name(format: Format) -> Option<&'static str> {
    match format {
        CF_TEXT => Some("CF_TEXT"),
        CF_BITMAP => Some("CF_BITMAP"),
        CF_DIB => Some("CF_DIB"),
        CF_UNICODETEXT => Some("CF_UNICODETEXT"),
        CF_HDROP => Some("CF_HDROP"),
        CF_LOCALE => Some("CF_LOCALE"),
        CF_DIBV5 => Some("CF_DIBV5"),
        _ => None,
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq, EnumIter)]
pub enum KnownAtom {
    Clipboard,
    Primary,
    CdkSelection,
    ClipboardManager,
    WmTransientFor,
    Targets,
    Delete,
    SaveTargets,
    Utf8String,
    Text,
    CompoundText,
    TextUriList,
    TextHtml,
    ImagePng,
    ImageJpeg,
    ImageBmp,
    ImageGif,
    LocalDndSelection,
    DropfilesDnd,
    Ole2Dnd,
    Png,
    Jfif,
    Gif,
    CfDib,
    CfShellIdList,
    CfUnicodeText,
    CfText,
}

impl KnownAtom {
    pub fn name(&self) -> &'static str {
        match self {
            KnownAtom::Clipboard => "CLIPBOARD",
            KnownAtom::Primary => "PRIMARY",
            KnownAtom::CdkSelection => "CDK_SELECTION",
            KnownAtom::ClipboardManager => "CLIPBOARD_MANAGER",
            KnownAtom::WmTransientFor => "WM_TRANSIENT_FOR",
            KnownAtom::Targets => "TARGETS",
            KnownAtom::Delete => "DELETE",
            KnownAtom::SaveTargets => "SAVE_TARGETS",
            KnownAtom::Utf8String => "UTF8_STRING",
            KnownAtom::Text => "TEXT",
            KnownAtom::CompoundText => "COMPOUND_TEXT",
            KnownAtom::TextUriList => "text/uri-list",
            KnownAtom::TextHtml => "text/html",
            KnownAtom::ImagePng => "image/png",
            KnownAtom::ImageJpeg => "image/jpeg",
            KnownAtom::ImageBmp => "image/bmp",
            KnownAtom::ImageGif => "image/gif",
            KnownAtom::LocalDndSelection => "LocalDndSelection",
            KnownAtom::DropfilesDnd => "DROPFILES_DND",
            KnownAtom::Ole2Dnd => "OLE2_DND",
            KnownAtom::Png => "PNG",
            KnownAtom::Jfif => "JFIF",
            KnownAtom::Gif => "GIF",
            KnownAtom::CfDib => "CF_DIB",
            KnownAtom::CfShellIdList => "Shell IDList Array",
            KnownAtom::CfUnicodeText => "CF_UNICODETEXT",
            KnownAtom::CfText => "CF_TEXT",
        }
    }
}

/// Interned names. Known atoms occupy the first slots after `NONE`.
#[derive(Debug, Clone)]
pub struct AtomTable {
    names: Vec<String>,
    ids: HashMap<String, Atom>,
}

impl AtomTable {
    pub fn new() -> Self {
        let mut table = Self {
            names: Vec::new(),
            ids: HashMap::new(),
        };

        table.intern("NONE");
        KnownAtom::iter().for_each(|atom| {
            table.intern(atom.name());
        });

        table
    }

    pub fn intern(
        &mut self,
        name: &str,
    ) -> Atom {
        if let Some(&atom) = self.ids.get(name) {
            return atom;
        }

        let atom = self.names.len() as Atom;
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), atom);

        atom
    }

    pub fn lookup(
        &self,
        name: &str,
    ) -> Option<Atom> {
        self.ids.get(name).copied()
    }

    pub fn name(
        &self,
        atom: Atom,
    ) -> Option<&str> {
        self.names.get(atom as usize).map(String::as_str)
    }

    #[inline]
    pub fn known(
        &self,
        atom: KnownAtom,
    ) -> Atom {
        atom as Atom + 1
    }

    pub fn is(
        &self,
        atom: Atom,
        known: KnownAtom,
    ) -> bool {
        atom == self.known(known)
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq, EnumIter)]
pub enum KnownFormat {
    Png,
    Jfif,
    Gif,
    UniformResourceLocatorW,
    ShellIdList,
    HtmlFormat,
    TextHtml,
    ImagePng,
    ImageJpeg,
    ImageBmp,
    ImageGif,
    TextUriList,
    Utf8String,
}

impl KnownFormat {
    pub fn name(&self) -> &'static str {
        match self {
            KnownFormat::Png => "PNG",
            KnownFormat::Jfif => "JFIF",
            KnownFormat::Gif => "GIF",
            KnownFormat::UniformResourceLocatorW => "UniformResourceLocatorW",
            KnownFormat::ShellIdList => "Shell IDList Array",
            KnownFormat::HtmlFormat => "HTML Format",
            KnownFormat::TextHtml => "text/html",
            KnownFormat::ImagePng => "image/png",
            KnownFormat::ImageJpeg => "image/jpeg",
            KnownFormat::ImageBmp => "image/bmp",
            KnownFormat::ImageGif => "image/gif",
            KnownFormat::TextUriList => "text/uri-list",
            KnownFormat::Utf8String => "UTF8_STRING",
        }
    }
}

/// Platform clipboard format ids registered once per display.
#[derive(Debug, Clone)]
pub struct FormatTable {
    formats: HashMap<KnownFormat, Format>,
}

impl FormatTable {
    pub fn register(platform: &mut dyn DisplayPlatform) -> Self {
        Self {
            formats: KnownFormat::iter()
                .map(|format| (format, platform.register_clipboard_format(format.name())))
                .collect(),
        }
    }

    pub fn get(
        &self,
        format: KnownFormat,
    ) -> Format {
        self.formats.get(&format).copied().unwrap_or(0)
    }

    pub fn known(
        &self,
        format: Format,
    ) -> Option<KnownFormat> {
        self.formats
            .iter()
            .find(|&(_, &id)| id == format)
            .map(|(&known, _)| known)
    }
}

pub fn format_name(
    platform: &dyn DisplayPlatform,
    format: Format,
) -> Option<String> {
    predefined_format_name(format)
        .map(str::to_owned)
        .or_else(|| platform.clipboard_format_name(format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_atoms_are_interned_in_declaration_order() {
        let table = AtomTable::new();

        for atom in KnownAtom::iter() {
            assert_eq!(table.lookup(atom.name()), Some(table.known(atom)));
            assert_eq!(table.name(table.known(atom)), Some(atom.name()));
        }
    }

    #[test]
    fn interning_is_idempotent() {
        let mut table = AtomTable::new();
        let atom = table.intern("application/x-color");

        assert_eq!(table.intern("application/x-color"), atom);
        assert_eq!(table.intern("UTF8_STRING"), table.known(KnownAtom::Utf8String));
        assert_eq!(table.name(NONE), Some("NONE"));
    }
}
