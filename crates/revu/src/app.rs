use ratatui::prelude::Rect;
use revu_provider::ReviewProvider;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::{
    action::Action,
    components::{review_board::ReviewBoard, Component},
    config::Config,
    tui::{self, Frame},
};

pub struct App {
    config: Config,
    tick_rate: f64,
    frame_rate: f64,
    should_quit: bool,
    components: Vec<Box<dyn Component>>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tick_rate: 4.0,
            frame_rate: 30.0,
            should_quit: false,
            components: Vec::new(),
        }
    }

    pub fn register_components(&mut self, provider: ReviewProvider) -> &mut Self {
        self.components.push(Box::new(ReviewBoard::new(provider)));
        self
    }

    fn draw(&mut self, f: &mut Frame<'_>, action_tx: &UnboundedSender<Action>) {
        let area = f.size();
        for c in self.components.iter_mut() {
            if let Err(e) = c.draw(f, area) {
                // The loop is still holding the receiver, so this cannot fail.
                let _ = action_tx.send(Action::Error(format!("failed to draw {:?}", e)));
            }
        }
    }

    fn apply(
        &mut self,
        apply_fn: impl Fn(&mut Box<dyn Component>) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        for c in self.components.iter_mut() {
            apply_fn(c)?;
        }

        Ok(())
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let (action_tx, mut action_rx) = mpsc::unbounded_channel();

        let mut tui = tui::Tui::new()?
            .tick_rate(self.tick_rate)
            .frame_rate(self.frame_rate);
        tui.enter()?;

        let config = self.config.clone();
        self.apply(|c| {
            c.register_action_handler(action_tx.clone())?;
            c.register_config_handler(config.clone())
        })?;
        self.apply(|c| c.init())?;

        loop {
            if let Some(e) = tui.next().await {
                match e {
                    tui::Event::Key(key) => {
                        if let Some(action) = self.config.keybinds.action_for(&key) {
                            tracing::debug!("got action: {action:?}");
                            action_tx.send(action.clone())?;
                        }
                    }
                    tui::Event::Resize(x, y) => action_tx.send(Action::Resize(x, y))?,
                    tui::Event::Tick => action_tx.send(Action::Tick)?,
                    tui::Event::Render => action_tx.send(Action::Render)?,
                    tui::Event::Error => {}
                }

                self.apply(|c| {
                    if let Some(action) = c.handle_events(Some(e.clone()))? {
                        action_tx.send(action)?;
                    }

                    Ok(())
                })?;
            }

            while let Ok(action) = action_rx.try_recv() {
                if action != Action::Tick && action != Action::Render {
                    tracing::debug!("{action:?}");
                }

                match &action {
                    Action::Resize(x, y) => {
                        tui.resize(Rect::new(0, 0, *x, *y))?;
                        tui.draw(|f| self.draw(f, &action_tx))?;
                    }
                    Action::Render => {
                        tui.draw(|f| self.draw(f, &action_tx))?;
                    }
                    Action::Quit => self.should_quit = true,
                    Action::Error(e) => tracing::error!("{e}"),
                    _ => {}
                }

                self.apply(|c| {
                    if let Some(action) = c.update(action.clone())? {
                        action_tx.send(action)?;
                    }

                    Ok(())
                })?;
            }

            if self.should_quit {
                break;
            }
        }

        self.apply(|c| c.unmount())?;
        tui.exit()?;

        Ok(())
    }
}
