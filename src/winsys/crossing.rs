use crate::event::CrossingData;
use crate::event::CrossingMode;
use crate::event::Event;
use crate::event::EventKind;
use crate::event::NotifyDetail;
use crate::input::DeviceId;
use crate::input::ModifierType;
use crate::input::SeatId;
use crate::registry::WindowRegistry;
use crate::window::Window;
use crate::window::WindowType;

/// Everything a crossing sequence shares besides its endpoints.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CrossingContext {
    pub mode: CrossingMode,
    pub x_root: f64,
    pub y_root: f64,
    pub state: ModifierType,
    pub time: u32,
    pub device: DeviceId,
    pub source_device: DeviceId,
    pub seat: SeatId,
    /// Native window and owner-events flag of the pointer grab in effect.
    pub grab: Option<(Window, bool)>,
}

fn crossing_event(
    registry: &WindowRegistry,
    window: Window,
    leave: bool,
    detail: NotifyDetail,
    subwindow: Option<Window>,
    ctx: &CrossingContext,
) -> Option<Event> {
    if let Some((grab_window, owner_events)) = ctx.grab {
        if !owner_events && ctx.mode != CrossingMode::Ungrab && window != grab_window {
            return None;
        }
    }

    let origin = registry.root_origin(window);
    let data = CrossingData {
        x: ctx.x_root - origin.x as f64,
        y: ctx.y_root - origin.y as f64,
        x_root: ctx.x_root,
        y_root: ctx.y_root,
        mode: ctx.mode,
        detail,
        subwindow,
        state: ctx.state,
        focus: false,
    };

    let kind = if leave {
        EventKind::Leave(data)
    } else {
        EventKind::Enter(data)
    };

    Some(
        Event::new(kind, Some(window))
            .with_time(ctx.time)
            .with_device(ctx.device, ctx.source_device)
            .with_seat(ctx.seat),
    )
}

/// The leave events from `src` up to the common ancestor, then the enter
/// events down to `dest`, in delivery order.
pub fn synthesize_crossings(
    registry: &WindowRegistry,
    src: Option<Window>,
    dest: Option<Window>,
    ctx: &CrossingContext,
    non_linear: bool,
) -> Vec<Event> {
    let usable = |window: Option<Window>| {
        window.filter(|&window| {
            registry
                .kind(window)
                .map_or(false, |kind| kind != WindowType::Root)
        })
    };

    let a = usable(src);
    let b = usable(dest);
    let mut events = Vec::new();

    if a == b {
        return events;
    }

    let c = match (a, b) {
        (Some(a), Some(b)) => registry.common_ancestor(a, b),
        _ => None,
    };

    let non_linear = non_linear || (c != a && c != b);

    if let Some(a) = a {
        let detail = if non_linear {
            NotifyDetail::Nonlinear
        } else if c == Some(a) {
            NotifyDetail::Inferior
        } else {
            NotifyDetail::Ancestor
        };

        events.extend(crossing_event(registry, a, true, detail, None, ctx));

        if c != Some(a) {
            let detail = if non_linear {
                NotifyDetail::NonlinearVirtual
            } else {
                NotifyDetail::Virtual
            };

            let mut last = a;
            let mut current = registry.native_parent(a);

            while let Some(window) = current {
                if Some(window) == c {
                    break;
                }

                events.extend(crossing_event(registry, window, true, detail, Some(last), ctx));

                last = window;
                current = registry.native_parent(window);
            }
        }
    }

    if let Some(b) = b {
        if c != Some(b) {
            let mut path = Vec::new();
            let mut current = registry.native_parent(b);

            while let Some(window) = current {
                if Some(window) == c {
                    break;
                }

                path.push(window);
                current = registry.native_parent(window);
            }

            path.reverse();

            let detail = if non_linear {
                NotifyDetail::NonlinearVirtual
            } else {
                NotifyDetail::Virtual
            };

            for (index, &window) in path.iter().enumerate() {
                let next = path.get(index + 1).copied().unwrap_or(b);
                events.extend(crossing_event(registry, window, false, detail, Some(next), ctx));
            }
        }

        let detail = if non_linear {
            NotifyDetail::Nonlinear
        } else if c == a {
            NotifyDetail::Ancestor
        } else {
            NotifyDetail::Inferior
        };

        events.extend(crossing_event(registry, b, false, detail, None, ctx));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::geometry::Region;
    use crate::registry::WindowAttributes;

    fn context(mode: CrossingMode) -> CrossingContext {
        CrossingContext {
            mode,
            x_root: 50f64,
            y_root: 60f64,
            state: ModifierType::empty(),
            time: 7,
            device: 1,
            source_device: 3,
            seat: 1,
            grab: None,
        }
    }

    fn summary(events: &[Event]) -> Vec<(&'static str, Window, NotifyDetail, Option<Window>)> {
        events
            .iter()
            .map(|event| match &event.kind {
                EventKind::Enter(data) => ("enter", event.window.unwrap_or(0), data.detail, data.subwindow),
                EventKind::Leave(data) => ("leave", event.window.unwrap_or(0), data.detail, data.subwindow),
                _ => ("other", 0, NotifyDetail::Unknown, None),
            })
            .collect()
    }

    /// top ─ mid ─ leaf, plus a sibling `other` under top and a second toplevel.
    fn tree() -> (WindowRegistry, Window, Window, Window, Window, Window) {
        let mut registry = WindowRegistry::new(1, Region::new(0, 0, 800, 600));
        let root = registry.root();
        let child = |region| WindowAttributes::child(region);

        let top = registry.insert(
            Some(root),
            2,
            &WindowAttributes::toplevel(Region::new(10, 20, 300, 300)),
            1,
        );
        let mid = registry.insert(Some(top), 3, &child(Region::new(5, 5, 100, 100)), 1);
        let leaf = registry.insert(Some(mid), 4, &child(Region::new(1, 1, 10, 10)), 1);
        let other = registry.insert(Some(top), 5, &child(Region::new(200, 5, 50, 50)), 1);
        let second = registry.insert(
            Some(root),
            6,
            &WindowAttributes::toplevel(Region::new(400, 20, 100, 100)),
            1,
        );

        (registry, top, mid, leaf, other, second)
    }

    #[test]
    fn entering_a_descendant_is_inferior_then_virtual() {
        let (registry, top, mid, leaf, _, _) = tree();
        let events = synthesize_crossings(&registry, Some(top), Some(leaf), &context(CrossingMode::Normal), false);

        assert_eq!(summary(&events), vec![
            ("leave", top, NotifyDetail::Inferior, None),
            ("enter", mid, NotifyDetail::Virtual, Some(leaf)),
            ("enter", leaf, NotifyDetail::Ancestor, None),
        ]);
    }

    #[test]
    fn leaving_to_an_ancestor_mirrors_entering() {
        let (registry, top, mid, leaf, _, _) = tree();
        let events = synthesize_crossings(&registry, Some(leaf), Some(top), &context(CrossingMode::Normal), false);

        assert_eq!(summary(&events), vec![
            ("leave", leaf, NotifyDetail::Ancestor, None),
            ("leave", mid, NotifyDetail::Virtual, Some(leaf)),
            ("enter", top, NotifyDetail::Inferior, None),
        ]);
    }

    #[test]
    fn sibling_crossings_are_nonlinear() {
        let (registry, _, mid, leaf, other, _) = tree();
        let events = synthesize_crossings(&registry, Some(leaf), Some(other), &context(CrossingMode::Normal), false);

        assert_eq!(summary(&events), vec![
            ("leave", leaf, NotifyDetail::Nonlinear, None),
            ("leave", mid, NotifyDetail::NonlinearVirtual, Some(leaf)),
            ("enter", other, NotifyDetail::Nonlinear, None),
        ]);
    }

    #[test]
    fn crossing_between_toplevels_walks_both_chains() {
        let (registry, top, mid, leaf, _, second) = tree();
        let events = synthesize_crossings(&registry, Some(leaf), Some(second), &context(CrossingMode::Normal), false);

        assert_eq!(summary(&events), vec![
            ("leave", leaf, NotifyDetail::Nonlinear, None),
            ("leave", mid, NotifyDetail::NonlinearVirtual, Some(leaf)),
            ("leave", top, NotifyDetail::NonlinearVirtual, Some(mid)),
            ("enter", second, NotifyDetail::Nonlinear, None),
        ]);
    }

    #[test]
    fn leaving_to_nowhere_is_a_single_leave() {
        let (registry, top, _, _, _, _) = tree();
        let root = registry.root();

        let events = synthesize_crossings(&registry, Some(top), Some(root), &context(CrossingMode::Normal), false);
        assert_eq!(summary(&events), vec![("leave", top, NotifyDetail::Nonlinear, None)]);

        let events = synthesize_crossings(&registry, Some(top), Some(top), &context(CrossingMode::Normal), false);
        assert!(events.is_empty());
    }

    #[test]
    fn local_coordinates_are_relative_to_each_window() {
        let (registry, top, _, leaf, _, _) = tree();
        let events = synthesize_crossings(&registry, Some(top), Some(leaf), &context(CrossingMode::Normal), false);

        match &events[2].kind {
            EventKind::Enter(data) => {
                assert_eq!((data.x, data.y), (50f64 - 16f64, 60f64 - 26f64));
                assert_eq!((data.x_root, data.y_root), (50f64, 60f64));
            },
            kind => panic!("unexpected {:?}", kind),
        }
    }

    #[test]
    fn exclusive_grabs_confine_crossings_to_the_grab_window() {
        let (registry, top, _, leaf, _, _) = tree();
        let mut ctx = context(CrossingMode::Grab);
        ctx.grab = Some((leaf, false));

        let events = synthesize_crossings(&registry, Some(top), Some(leaf), &ctx, false);
        assert_eq!(summary(&events), vec![("enter", leaf, NotifyDetail::Ancestor, None)]);

        ctx.mode = CrossingMode::Ungrab;
        assert_eq!(synthesize_crossings(&registry, Some(top), Some(leaf), &ctx, false).len(), 3);
    }
}
