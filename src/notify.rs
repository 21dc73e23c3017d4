use tracing::info;

use crate::models::{Notice, NoticeLevel, Route};

/// Transient user-facing messages.
pub trait Notifier {
    fn notify(&mut self, notice: Notice);

    fn success(&mut self, message: &str) {
        self.notify(Notice::success(message));
    }

    fn error(&mut self, message: &str) {
        self.notify(Notice::error(message));
    }
}

/// Moves the user to another view.
pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

/// Prints notices for one-shot commands: successes to stdout, errors to
/// stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    pub errors: usize,
}

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice.message),
            NoticeLevel::Error => {
                self.errors += 1;
                eprintln!("Error: {}", notice.message);
            }
        }
    }
}

/// Remembers where the user was sent. A terminal has nowhere to go, so the
/// caller decides what to do with the route afterwards.
#[derive(Debug, Default)]
pub struct RouteRecorder {
    pub route: Option<Route>,
}

impl Navigator for RouteRecorder {
    fn navigate(&mut self, route: Route) {
        info!(route = %route.path(), "navigating");
        self.route = Some(route);
    }
}
