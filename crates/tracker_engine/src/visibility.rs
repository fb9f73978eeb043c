use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// Writer side of the visibility signal, owned by whatever observes the
/// hosting surface.
#[derive(Debug)]
pub struct VisibilityController {
    tx: watch::Sender<Visibility>,
}

impl VisibilityController {
    /// Publishes a new visibility; repeated values do not wake the scheduler.
    pub fn set(&self, visibility: Visibility) {
        self.tx.send_if_modified(|current| {
            if *current == visibility {
                false
            } else {
                *current = visibility;
                true
            }
        });
    }

    pub fn current(&self) -> Visibility {
        *self.tx.borrow()
    }
}

/// Reader side consumed by the scheduler. An absent signal reads as always
/// visible and never reports a change.
#[derive(Debug, Clone)]
pub struct VisibilitySignal {
    rx: Option<watch::Receiver<Visibility>>,
    last: Visibility,
}

impl VisibilitySignal {
    pub fn channel(initial: Visibility) -> (VisibilityController, VisibilitySignal) {
        let (tx, rx) = watch::channel(initial);
        (
            VisibilityController { tx },
            VisibilitySignal {
                rx: Some(rx),
                last: initial,
            },
        )
    }

    pub fn absent() -> Self {
        Self {
            rx: None,
            last: Visibility::Visible,
        }
    }

    pub fn current(&self) -> Visibility {
        self.rx.as_ref().map_or(self.last, |rx| *rx.borrow())
    }

    /// Resolves on the next visibility change. Once the controller is gone
    /// the last value sticks and this never resolves again.
    pub async fn changed(&mut self) -> Visibility {
        if let Some(rx) = self.rx.as_mut() {
            match rx.changed().await {
                Ok(()) => {
                    let visibility = *rx.borrow_and_update();
                    self.last = visibility;
                    return visibility;
                }
                Err(_) => {
                    self.last = *rx.borrow();
                    self.rx = None;
                }
            }
        }
        std::future::pending().await
    }
}
