pub use crate::Result;

use crate::atoms::format_name;
use crate::atoms::Atom;
use crate::atoms::AtomTable;
use crate::atoms::Format;
use crate::atoms::FormatTable;
use crate::atoms::KnownAtom;
use crate::atoms::KnownFormat;
use crate::atoms::CF_DIB;
use crate::atoms::CF_DIBV5;
use crate::atoms::CF_TEXT;
use crate::atoms::CF_UNICODETEXT;
use crate::platform::DisplayPlatform;
use crate::transmute;
use crate::window::Hwnd;
use crate::window::Window;

use std::collections::HashMap;

use anyhow::anyhow;

/// Retry ticks after which a queued clipboard request is abandoned.
pub const CLIPBOARD_IDLE_ABORT_TIME: u32 = 30;
pub const CLIPBOARD_RETRY_INTERVAL: u32 = 1000;

/// How long a synchronous render request may spin the event loop.
pub const RENDER_DEADLINE: u32 = 1000;

/// Image types the codec can decode, presented to other processes as PNG
/// or DIB.
const PIXBUF_TARGETS: &[&str] = &[
    "image/png",
    "image/bmp",
    "image/x-bmp",
    "image/x-MS-bmp",
];

/// One way of carrying `target` through the platform as `format`.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct SelFormat {
    pub target: Atom,
    pub format: Format,
    pub transmute: bool,
}

impl SelFormat {
    pub fn new(
        target: Atom,
        format: Format,
        transmute: bool,
    ) -> Self {
        Self {
            target,
            format,
            transmute,
        }
    }
}

/// Converted selection data waiting for its requestor to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionProperty {
    pub kind: Atom,
    pub bitness: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ClipboardState {
    Closed,
    /// Opened without an owner window.
    Anonymous,
    OpenFor(Hwnd),
}

impl ClipboardState {
    pub fn is_open(&self) -> bool {
        *self != ClipboardState::Closed
    }

    pub fn from_owner(owner: Option<Hwnd>) -> Self {
        owner.map_or(ClipboardState::Anonymous, ClipboardState::OpenFor)
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum QueueAction {
    Targets,
    Convert,
}

/// A clipboard operation waiting for the clipboard to become available.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClipboardRequest {
    pub requestor: Window,
    pub selection: Atom,
    pub target: Atom,
    pub time: u32,
    pub idle: u32,
    pub action: QueueAction,
}

/// A platform request for data that the owning window must answer
/// through a property change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSlot {
    pub format: Format,
    pub target: Atom,
    pub transmute: bool,
    pub data: Option<Vec<u8>>,
}

impl RenderSlot {
    pub fn new(sel: SelFormat) -> Self {
        Self {
            format: sel.format,
            target: sel.target,
            transmute: sel.transmute,
            data: None,
        }
    }
}

pub fn encode_atoms(atoms: &[Atom]) -> Vec<u8> {
    atoms.iter().flat_map(|atom| atom.to_le_bytes()).collect()
}

pub fn decode_atoms(data: &[u8]) -> Vec<Atom> {
    data.chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Selection ownership, the target/format compatibility tables and the
/// transfer state shared by the clipboard and drag-and-drop paths.
#[derive(Debug)]
pub struct SelectionBroker {
    compat_formats: HashMap<Atom, Vec<SelFormat>>,
    compat_targets: HashMap<Format, Vec<SelFormat>>,
    pixbuf_targets: Vec<Atom>,
    formats: FormatTable,

    pub owners: HashMap<Atom, Window>,
    pub properties: HashMap<Window, SelectionProperty>,
    pub clipboard_targets: Vec<SelFormat>,
    pub dnd_targets: Vec<SelFormat>,
    pub clipboard: ClipboardState,
    pub ignore_destroy_clipboard: bool,
    pub targets_request_pending: bool,
    pub property_change_target: Option<Atom>,
    pub render: Option<RenderSlot>,
    pub dropfiles: Option<SelectionProperty>,
    pub queue: Vec<ClipboardRequest>,
    /// Window carrying the clipboard retry timer while it runs.
    pub retry_timer: Option<Hwnd>,
    pub stored_clipboard_owner: Option<Hwnd>,
}

impl SelectionBroker {
    pub fn new(
        atoms: &mut AtomTable,
        formats: FormatTable,
    ) -> Self {
        let atom = |known| atoms.known(known);
        let format = |known| formats.get(known);

        let utf8 = atom(KnownAtom::Utf8String);
        let png = atom(KnownAtom::ImagePng);
        let jpeg = atom(KnownAtom::ImageJpeg);
        let gif = atom(KnownAtom::ImageGif);
        let bmp = atom(KnownAtom::ImageBmp);

        let compat_formats = map!(
            utf8 => vec![
                SelFormat::new(utf8, format(KnownFormat::Utf8String), false),
                SelFormat::new(utf8, CF_UNICODETEXT, true),
                SelFormat::new(utf8, CF_TEXT, true),
            ],
            png => vec![
                SelFormat::new(png, format(KnownFormat::ImagePng), false),
                SelFormat::new(png, format(KnownFormat::Png), false),
            ],
            jpeg => vec![
                SelFormat::new(jpeg, format(KnownFormat::ImageJpeg), false),
                SelFormat::new(jpeg, format(KnownFormat::Jfif), false),
            ],
            gif => vec![
                SelFormat::new(gif, format(KnownFormat::ImageGif), false),
                SelFormat::new(gif, format(KnownFormat::Gif), false),
            ],
            bmp => vec![
                SelFormat::new(bmp, format(KnownFormat::ImageBmp), false),
                SelFormat::new(bmp, CF_DIB, true),
            ],
        );

        let shell_id_list = format(KnownFormat::ShellIdList);
        let compat_targets = map!(
            CF_TEXT => vec![
                SelFormat::new(atom(KnownAtom::CfText), CF_TEXT, false),
                SelFormat::new(utf8, CF_TEXT, true),
            ],
            CF_UNICODETEXT => vec![
                SelFormat::new(atom(KnownAtom::CfUnicodeText), CF_UNICODETEXT, false),
                SelFormat::new(utf8, CF_UNICODETEXT, true),
            ],
            format(KnownFormat::Png) => vec![
                SelFormat::new(atom(KnownAtom::Png), format(KnownFormat::Png), false),
                SelFormat::new(png, format(KnownFormat::Png), false),
            ],
            format(KnownFormat::Jfif) => vec![
                SelFormat::new(atom(KnownAtom::Jfif), format(KnownFormat::Jfif), false),
                SelFormat::new(jpeg, format(KnownFormat::Jfif), false),
            ],
            format(KnownFormat::Gif) => vec![
                SelFormat::new(atom(KnownAtom::Gif), format(KnownFormat::Gif), false),
                SelFormat::new(gif, format(KnownFormat::Gif), false),
            ],
            CF_DIB => vec![
                SelFormat::new(atom(KnownAtom::CfDib), CF_DIB, false),
                SelFormat::new(bmp, CF_DIB, true),
            ],
            shell_id_list => vec![
                SelFormat::new(atom(KnownAtom::CfShellIdList), shell_id_list, false),
                SelFormat::new(atom(KnownAtom::TextUriList), shell_id_list, true),
            ],
        );

        let pixbuf_targets = PIXBUF_TARGETS.iter().map(|name| atoms.intern(name)).collect();

        Self {
            compat_formats,
            compat_targets,
            pixbuf_targets,
            formats,

            owners: HashMap::new(),
            properties: HashMap::new(),
            clipboard_targets: Vec::new(),
            dnd_targets: Vec::new(),
            clipboard: ClipboardState::Closed,
            ignore_destroy_clipboard: false,
            targets_request_pending: false,
            property_change_target: None,
            render: None,
            dropfiles: None,
            queue: Vec::new(),
            retry_timer: None,
            stored_clipboard_owner: None,
        }
    }

    #[inline]
    pub fn formats(&self) -> &FormatTable {
        &self.formats
    }

    pub fn pixbuf_targets(&self) -> &[Atom] {
        &self.pixbuf_targets
    }

    fn is_pixbuf_target(
        &self,
        target: Atom,
    ) -> bool {
        self.pixbuf_targets.contains(&target)
    }

    /// The platform formats `target` can travel as besides its own name.
    /// Image types without an entry of their own are re-encoded.
    pub fn compat_formats_for(
        &self,
        target: Atom,
    ) -> Vec<SelFormat> {
        if let Some(formats) = self.compat_formats.get(&target) {
            return formats.clone();
        }

        if self.is_pixbuf_target(target) {
            return vec![
                SelFormat::new(target, self.formats.get(KnownFormat::Png), true),
                SelFormat::new(target, CF_DIB, true),
            ];
        }

        Vec::new()
    }

    pub fn compat_targets_for(
        &self,
        format: Format,
    ) -> &[SelFormat] {
        self.compat_targets
            .get(&format)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Records every target `format` can be read as: the target named
    /// after the format itself, then the compatible ones.
    pub fn add_format_to_targets(
        &self,
        platform: &dyn DisplayPlatform,
        atoms: &mut AtomTable,
        format: Format,
        targets: &mut Vec<SelFormat>,
    ) {
        if let Some(name) = format_name(platform, format) {
            let target = atoms.intern(&name);

            if !targets.iter().any(|sel| sel.target == target) {
                targets.push(SelFormat::new(target, format, false));
            }
        }

        for &sel in self.compat_targets_for(format) {
            if !targets
                .iter()
                .any(|known| known.target == sel.target && known.format == sel.format)
            {
                targets.push(sel);
            }
        }
    }

    /// Records every format `target` can be offered as. Returns how many
    /// pairs were added; a target already present adds nothing.
    pub fn add_target_to_formats(
        &self,
        platform: &mut dyn DisplayPlatform,
        atoms: &AtomTable,
        target: Atom,
        formats: &mut Vec<SelFormat>,
    ) -> usize {
        if formats.iter().any(|sel| sel.target == target) {
            return 0;
        }

        if atoms.is(target, KnownAtom::Targets)
            || atoms.is(target, KnownAtom::CompoundText)
            || atoms.is(target, KnownAtom::SaveTargets)
        {
            formats.push(SelFormat::new(target, 0, false));
            return 1;
        }

        let name = match atoms.name(target) {
            Some(name) => name,
            None => return 0,
        };

        let start = formats.len();
        formats.push(SelFormat::new(
            target,
            platform.register_clipboard_format(name),
            false,
        ));

        for sel in self.compat_formats_for(target) {
            if !formats[start..].iter().any(|known| known.format == sel.format) {
                formats.push(sel);
            }
        }

        formats.len() - start
    }

    /// Data the toolkit supplied for `target`, converted to `format`.
    pub fn transmute_target(
        &self,
        atoms: &AtomTable,
        target: Atom,
        format: Format,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        if self.is_pass_through(atoms, target, format) {
            return Ok(data.to_vec());
        }

        let utf8 = atoms.is(target, KnownAtom::Utf8String);

        if utf8 && format == CF_UNICODETEXT {
            transmute::utf8_to_utf16(data)
        } else if utf8 && format == CF_TEXT {
            transmute::utf8_to_latin1(data)
        } else if atoms.is(target, KnownAtom::ImageBmp) && (format == CF_DIB || format == CF_DIBV5) {
            transmute::bmp_to_dib(data)
        } else if self.is_pixbuf_target(target) && format == self.formats.get(KnownFormat::Png) {
            transmute::image_to_png(data)
        } else if self.is_pixbuf_target(target) && format == CF_DIB {
            transmute::image_to_dib(data)
        } else {
            warn!("unable to transmute target {} to format {:#x}", target, format);
            Err(anyhow!("no conversion from target {} to format {:#x}", target, format))
        }
    }

    /// Data read from the platform as `format`, converted to `target`.
    pub fn transmute_format(
        &self,
        platform: &dyn DisplayPlatform,
        atoms: &AtomTable,
        format: Format,
        target: Atom,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        if self.is_pass_through(atoms, target, format) {
            return Ok(data.to_vec());
        }

        let utf8 = atoms.is(target, KnownAtom::Utf8String);

        if utf8 && format == CF_UNICODETEXT {
            transmute::utf16_to_utf8(data)
        } else if utf8 && format == CF_TEXT {
            Ok(transmute::latin1_to_utf8(data))
        } else if atoms.is(target, KnownAtom::ImageBmp) && (format == CF_DIB || format == CF_DIBV5) {
            transmute::dib_to_bmp(data)
        } else if atoms.is(target, KnownAtom::TextUriList)
            && format == self.formats.get(KnownFormat::ShellIdList)
        {
            Ok(transmute::uri_list(platform.shell_id_list_paths(data)).into_bytes())
        } else {
            warn!("unable to transmute format {:#x} to target {}", format, target);
            Err(anyhow!("no conversion from format {:#x} to target {}", format, target))
        }
    }

    fn is_pass_through(
        &self,
        atoms: &AtomTable,
        target: Atom,
        format: Format,
    ) -> bool {
        [
            (KnownAtom::ImagePng, KnownFormat::Png),
            (KnownAtom::ImageJpeg, KnownFormat::Jfif),
            (KnownAtom::ImageGif, KnownFormat::Gif),
        ]
        .iter()
        .any(|&(known, known_format)| {
            atoms.is(target, known) && format == self.formats.get(known_format)
        })
    }

    pub fn store_property(
        &mut self,
        requestor: Window,
        kind: Atom,
        bitness: u8,
        data: Vec<u8>,
    ) {
        self.properties.insert(requestor, SelectionProperty {
            kind,
            bitness,
            data,
        });
    }

    pub fn property(
        &self,
        requestor: Window,
    ) -> Option<&SelectionProperty> {
        self.properties.get(&requestor)
    }

    pub fn delete_property(
        &mut self,
        requestor: Window,
    ) -> Option<SelectionProperty> {
        self.properties.remove(&requestor)
    }

    /// Queues a clipboard request unless one with the same action is
    /// already waiting for `requestor`.
    pub fn enqueue(
        &mut self,
        request: ClipboardRequest,
    ) -> bool {
        if self
            .queue
            .iter()
            .any(|queued| queued.action == request.action && queued.requestor == request.requestor)
        {
            return false;
        }

        self.queue.push(request);
        true
    }

    pub fn clear_targets(
        &mut self,
        atoms: &AtomTable,
        selection: Atom,
    ) {
        if atoms.is(selection, KnownAtom::Ole2Dnd) || atoms.is(selection, KnownAtom::LocalDndSelection) {
            self.dnd_targets.clear();
        } else if atoms.is(selection, KnownAtom::Clipboard) {
            self.clipboard_targets.clear();
        } else if !atoms.is(selection, KnownAtom::Primary) {
            warn!("unsupported selection {:?}", atoms.name(selection));
        }
    }

    /// The pair to use when the platform asks for `format`.
    pub fn clipboard_target_for(
        &self,
        format: Format,
    ) -> Option<SelFormat> {
        self.clipboard_targets
            .iter()
            .find(|sel| sel.format == format)
            .copied()
    }

    pub fn forget_window(
        &mut self,
        window: Window,
    ) {
        self.properties.remove(&window);
        self.owners.retain(|_, owner| *owner != window);
        self.queue.retain(|request| request.requestor != window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::headless::HeadlessPlatform;

    fn broker() -> (HeadlessPlatform, AtomTable, SelectionBroker) {
        let mut platform = HeadlessPlatform::new();
        let mut atoms = AtomTable::new();
        let formats = FormatTable::register(&mut platform);
        let broker = SelectionBroker::new(&mut atoms, formats);

        (platform, atoms, broker)
    }

    #[test]
    fn utf8_targets_are_offered_as_every_text_format() {
        let (mut platform, atoms, broker) = broker();
        let utf8 = atoms.known(KnownAtom::Utf8String);
        let mut formats = Vec::new();

        assert_eq!(broker.add_target_to_formats(&mut platform, &atoms, utf8, &mut formats), 3);
        assert_eq!(
            formats.iter().map(|sel| (sel.format, sel.transmute)).collect::<Vec<_>>(),
            vec![
                (broker.formats().get(KnownFormat::Utf8String), false),
                (CF_UNICODETEXT, true),
                (CF_TEXT, true),
            ]
        );

        assert_eq!(broker.add_target_to_formats(&mut platform, &atoms, utf8, &mut formats), 0);
    }

    #[test]
    fn meta_targets_are_kept_without_a_format() {
        let (mut platform, atoms, broker) = broker();
        let mut formats = Vec::new();

        broker.add_target_to_formats(&mut platform, &atoms, atoms.known(KnownAtom::Targets), &mut formats);

        assert_eq!(formats, vec![SelFormat::new(atoms.known(KnownAtom::Targets), 0, false)]);
    }

    #[test]
    fn custom_targets_register_a_format_of_the_same_name() {
        let (mut platform, mut atoms, broker) = broker();
        let target = atoms.intern("application/x-color");
        let mut formats = Vec::new();

        broker.add_target_to_formats(&mut platform, &atoms, target, &mut formats);

        assert_eq!(formats.len(), 1);
        assert_eq!(
            platform.clipboard_format_name(formats[0].format).as_deref(),
            Some("application/x-color")
        );
    }

    #[test]
    fn platform_formats_expand_to_their_targets() {
        let (platform, mut atoms, broker) = broker();
        let mut targets = Vec::new();

        broker.add_format_to_targets(&platform, &mut atoms, CF_UNICODETEXT, &mut targets);
        broker.add_format_to_targets(&platform, &mut atoms, CF_TEXT, &mut targets);

        let names: Vec<_> = targets
            .iter()
            .map(|sel| (atoms.name(sel.target).unwrap_or("?").to_owned(), sel.format))
            .collect();

        assert_eq!(names, vec![
            ("CF_UNICODETEXT".to_owned(), CF_UNICODETEXT),
            ("UTF8_STRING".to_owned(), CF_UNICODETEXT),
            ("CF_TEXT".to_owned(), CF_TEXT),
            ("UTF8_STRING".to_owned(), CF_TEXT),
        ]);
    }

    #[test]
    fn other_image_types_are_reencoded() {
        let (_, mut atoms, broker) = broker();
        let x_bmp = atoms.intern("image/x-bmp");

        let formats = broker.compat_formats_for(x_bmp);

        assert_eq!(formats.len(), 2);
        assert!(formats.iter().all(|sel| sel.transmute));
        assert!(broker.compat_formats_for(atoms.intern("text/plain")).is_empty());
    }

    #[test]
    fn text_survives_the_trip_through_the_clipboard() {
        let (platform, atoms, broker) = broker();
        let utf8 = atoms.known(KnownAtom::Utf8String);

        for &format in &[CF_UNICODETEXT, CF_TEXT] {
            let encoded = broker.transmute_target(&atoms, utf8, format, b"one\ntwo").unwrap();
            let decoded = broker.transmute_format(&platform, &atoms, format, utf8, &encoded).unwrap();

            assert_eq!(decoded, b"one\ntwo".to_vec());
        }
    }

    #[test]
    fn named_image_formats_pass_through() {
        let (platform, atoms, broker) = broker();
        let png = atoms.known(KnownAtom::ImagePng);
        let format = broker.formats().get(KnownFormat::Png);

        assert_eq!(broker.transmute_target(&atoms, png, format, b"\x89PNG").unwrap(), b"\x89PNG".to_vec());
        assert_eq!(
            broker.transmute_format(&platform, &atoms, format, png, b"\x89PNG").unwrap(),
            b"\x89PNG".to_vec()
        );
    }

    #[test]
    fn unknown_routes_are_errors() {
        let (platform, atoms, broker) = broker();
        let uri_list = atoms.known(KnownAtom::TextUriList);

        assert!(broker.transmute_target(&atoms, uri_list, CF_TEXT, b"x").is_err());
        assert!(broker.transmute_format(&platform, &atoms, CF_DIB, uri_list, b"x").is_err());
    }

    #[test]
    fn duplicate_queue_requests_are_dropped() {
        let (_, atoms, mut broker) = broker();
        let request = ClipboardRequest {
            requestor: 2,
            selection: atoms.known(KnownAtom::Clipboard),
            target: atoms.known(KnownAtom::Utf8String),
            time: 0,
            idle: 0,
            action: QueueAction::Convert,
        };

        assert!(broker.enqueue(request));
        assert!(!broker.enqueue(ClipboardRequest {
            target: atoms.known(KnownAtom::ImagePng),
            ..request
        }));
        assert!(broker.enqueue(ClipboardRequest {
            action: QueueAction::Targets,
            ..request
        }));
    }

    #[test]
    fn atoms_travel_as_little_endian_words() {
        assert_eq!(decode_atoms(&encode_atoms(&[1, 0x1234, 7])), vec![1, 0x1234, 7]);
    }
}
