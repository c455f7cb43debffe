use crate::atoms::KnownAtom;
use crate::display::DisplayCore;
use crate::dnd::DragAction;
use crate::dnd::DragProtocol;
use crate::event::DndData;
use crate::event::EventKind;
use crate::selection::SelectionProperty;
use crate::transmute;
use crate::win32::message::NativeMessage;
use crate::win32::message::Payload;
use crate::window::Window;

impl DisplayCore {
    /// A shell file drop on `window`. The dropped paths, with shortcuts
    /// followed, wait as a `text/uri-list` until the drop target
    /// converts the `DROPFILES_DND` selection.
    pub(crate) fn drop_files(
        &mut self,
        window: Window,
        msg: &NativeMessage,
        time: u32,
    ) {
        let (paths, point) = match &msg.payload {
            Payload::Files {
                paths,
                point,
            } => (paths, *point),
            _ => {
                warn!("unable to read the files dropped on window {}", window);
                return;
            },
        };

        let resolved: Vec<String> = paths
            .iter()
            .map(|path| match self.platform.resolve_link(path) {
                Some(target) => {
                    debug!("dropped link {} points to {}", path, target);
                    target
                },
                None => path.clone(),
            })
            .collect();

        let list = transmute::uri_list(&resolved);
        let uri_list = self.atoms.known(KnownAtom::TextUriList);

        if self.selection.dropfiles.is_some() {
            debug!("replacing unread dropped files");
        }

        self.selection.dropfiles = Some(SelectionProperty {
            kind: uri_list,
            bitness: 8,
            data: list.into_bytes(),
        });

        if let Some(stale) = self.dnd.dest.take() {
            self.dnd.remove(stale);
        }

        let root = self.registry.root();
        let position = self.root_from_screen(point);
        let device = self.devices.core_pointer;
        let id = self.dnd.create(DragProtocol::Dropfiles, false, device, self.scale);

        if let Some(context) = self.dnd.get_mut(id) {
            context.source_window = Some(root);
            context.dest_window = Some(window);
            context.targets = vec![uri_list];
            context.actions = DragAction::COPY;
            context.suggested_action = DragAction::COPY;
            context.action = DragAction::COPY;
            context.last = position;
        }

        self.dnd.dest = Some(id);

        info!("{} file(s) dropped on window {}", resolved.len(), window);

        let event = self.pointer_event(
            EventKind::DropStart(DndData {
                context: id,
                x_root: position.x,
                y_root: position.y,
            }),
            window,
            time,
        );

        self.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Config;
    use crate::display::testing::*;
    use crate::event::EventMask;
    use crate::geometry::Pos;
    use crate::geometry::Region;
    use crate::win32::message::WM_DROPFILES;

    #[test]
    fn dropped_files_and_links_become_a_uri_list() {
        let (mut core, platform, events) = headless(Config::default());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 200, 200), EventMask::empty());
        let hwnd = core.registry().hwnd(window).unwrap();
        core.register_dnd(window);
        core.dispatch_pending();
        events.borrow_mut().clear();

        platform
            .state()
            .links
            .insert("C:\\b.lnk".to_owned(), "C:\\b.txt".to_owned());

        let msg = NativeMessage::new(hwnd, WM_DROPFILES, 0, 0).with_payload(Payload::Files {
            paths: vec!["C:\\a.txt".to_owned(), "C:\\b.lnk".to_owned()],
            point: Pos::new(30, 40),
        });
        core.handle_message(msg);

        assert_eq!(names(&events), vec![("drop-start", Some(window))]);

        let id = match &events.borrow()[0].kind {
            EventKind::DropStart(data) => {
                assert_eq!((data.x_root, data.y_root), (30, 40));
                data.context
            },
            kind => panic!("unexpected {:?}", kind),
        };

        let uri_list = core.atoms().known(KnownAtom::TextUriList);
        let context = core.dnd.get(id).unwrap();
        assert_eq!(context.protocol, DragProtocol::Dropfiles);
        assert_eq!(context.targets, vec![uri_list]);
        assert_eq!(context.source_window, Some(core.root()));

        let selection = core.atoms().known(KnownAtom::DropfilesDnd);
        core.convert_selection(window, selection, uri_list, 0);

        let property = core.selection_property(window).unwrap();
        assert_eq!(property.kind, uri_list);
        assert_eq!(
            String::from_utf8(property.data).unwrap(),
            "file:///C:/a.txt\r\nfile:///C:/b.txt\r\n"
        );
        assert!(core.selection.dropfiles.is_none());

        core.drop_finish(id, true, 0);
        assert!(core.dnd.get(id).is_none());
    }
}
