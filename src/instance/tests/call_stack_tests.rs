use super::*;

#[test]
fn outermost_frame_has_depth_one_and_no_parent() {
    let mut stack: TransitionCallStack<&str> = TransitionCallStack::new();
    let frame = stack.open("root");
    assert_eq!(stack.depth(frame), 1);
    assert_eq!(stack.parent(frame), None);
    assert_eq!(*stack.work(frame), "root");
    assert!(stack.is_idle());
}

#[test]
fn frames_opened_while_executing_nest_under_the_current_frame() {
    let mut stack: TransitionCallStack<&str> = TransitionCallStack::new();
    let outer = stack.open("outer");
    let previous = stack.begin(outer);
    assert_eq!(previous, None);
    assert!(!stack.is_idle());

    let inner = stack.open("inner");
    assert_eq!(stack.parent(inner), Some(outer));
    assert_eq!(stack.depth(inner), 2);

    stack.end(previous);
    assert!(stack.is_idle());
}

#[test]
fn postponed_children_queue_fifo_under_their_parent() {
    let mut stack: TransitionCallStack<&str> = TransitionCallStack::new();
    let outer = stack.open("outer");
    let previous = stack.begin(outer);
    let b = stack.open("b");
    let c = stack.open("c");
    let d = stack.open("d");
    assert_eq!(stack.postpone(b), None);
    assert_eq!(stack.postpone(c), None);
    assert_eq!(stack.postpone(d), None);
    stack.end(previous);

    assert_eq!(stack.next_child(outer), Some(b));
    assert_eq!(stack.next_child(outer), Some(c));
    assert_eq!(stack.next_child(outer), Some(d));
    assert_eq!(stack.next_child(outer), None);
}

#[test]
fn postponing_an_outermost_frame_hands_it_back() {
    let mut stack: TransitionCallStack<&str> = TransitionCallStack::new();
    let frame = stack.open("root");
    assert_eq!(stack.postpone(frame), Some(frame));
}

#[test]
fn end_restores_the_previously_executing_frame() {
    let mut stack: TransitionCallStack<&str> = TransitionCallStack::new();
    let outer = stack.open("outer");
    let previous = stack.begin(outer);

    let inner = stack.open("inner");
    let saved = stack.begin(inner);
    assert_eq!(saved, Some(outer));
    let nested = stack.open("nested");
    assert_eq!(stack.parent(nested), Some(inner));
    stack.end(saved);

    // Back inside `outer`: new frames nest under it again.
    let sibling = stack.open("sibling");
    assert_eq!(stack.parent(sibling), Some(outer));
    stack.end(previous);
    assert!(stack.is_idle());
}

#[test]
fn work_mut_updates_the_stored_work() {
    let mut stack: TransitionCallStack<Vec<u32>> = TransitionCallStack::new();
    let frame = stack.open(vec![1]);
    stack.work_mut(frame).push(2);
    assert_eq!(*stack.work(frame), vec![1, 2]);
}

/// Mirrors the drain loop of the cascade executor: the root's own work runs
/// first, then children in postponement order, descending into frames a
/// child opened while it ran before moving to the next sibling.
#[test]
fn drain_visits_nested_work_depth_first_in_postponement_order() {
    let mut stack: TransitionCallStack<&str> = TransitionCallStack::new();
    let root = stack.open("a");
    let previous = stack.begin(root);
    let b = stack.open("b");
    let c = stack.open("c");
    assert_eq!(stack.postpone(b), None);
    assert_eq!(stack.postpone(c), None);
    stack.end(previous);
    let outermost = stack.postpone(root).expect("root frame comes back");

    let mut visited = Vec::new();
    let enclosing = stack.begin(outermost);
    visited.push(*stack.work(outermost));
    let mut cursors = vec![(outermost, enclosing)];
    while let Some(&(frame, _)) = cursors.last() {
        match stack.next_child(frame) {
            Some(child) => {
                let saved = stack.begin(child);
                let label = *stack.work(child);
                visited.push(label);
                if label == "b" {
                    // Delayed work of `b` opens another frame mid-drain.
                    let d = stack.open("d");
                    assert_eq!(stack.parent(d), Some(b));
                    assert_eq!(stack.postpone(d), None);
                }
                cursors.push((child, saved));
            }
            None => {
                if let Some((_, saved)) = cursors.pop() {
                    stack.end(saved);
                }
            }
        }
    }

    assert_eq!(visited, ["a", "b", "d", "c"]);
    assert!(stack.is_idle());
}
