use crate::watcher::Events;

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, c_short};

/// Translates requested events into `poll(2)` interest bits.
///
/// Error and hang-up conditions are always reported by `poll(2)`, so
/// [`Events::ERROR`] needs no interest bit of its own.
pub(crate) fn interest_to_poll(interest: Events) -> c_short {
    let mut flags = 0;

    if interest.contains(Events::READ) {
        flags |= POLLIN;
    }
    if interest.contains(Events::WRITE) {
        flags |= POLLOUT;
    }

    flags
}

/// Translates `revents` into the events delivered to a watcher.
///
/// READ and WRITE are only reported when requested. A hang-up also reads
/// as READ for readers so they observe end-of-stream.
pub(crate) fn revents_to_events(revents: c_short, interest: Events) -> Events {
    let mut events = Events::empty();

    if revents & POLLIN != 0 && interest.contains(Events::READ) {
        events |= Events::READ;
    }
    if revents & POLLOUT != 0 && interest.contains(Events::WRITE) {
        events |= Events::WRITE;
    }
    if revents & (POLLERR | POLLNVAL) != 0 {
        events |= Events::ERROR;
    }
    if revents & POLLHUP != 0 {
        events |= Events::HUP;
        if interest.contains(Events::READ) {
            events |= Events::READ;
        }
    }

    events
}
