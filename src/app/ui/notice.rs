use eframe::egui::{self, Align2, Context, RichText, Vec2};

use crate::controller::{Controller, Intent};
use crate::roadmap::NotificationItem;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_notification(&mut self, ctx: &Context, controller: &Controller) {
        let queue = controller.notifications();
        let Some(item) = queue.current() else {
            return;
        };

        let (title, body) = match item {
            NotificationItem::Badge {
                title, description, ..
            } => (format!("Badge earned: {title}"), description.clone()),
            NotificationItem::LevelUp { level } => (
                format!("Level {level} reached!"),
                "Keep going, the next level is waiting.".to_owned(),
            ),
            NotificationItem::Unknown => return,
        };

        egui::Window::new("Achievement")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading(RichText::new(title).strong());
                    if !body.is_empty() {
                        ui.add_space(6.0);
                        ui.label(body);
                    }
                    if queue.len() > 1 {
                        ui.small(format!("{} more waiting", queue.len() - 1));
                    }
                    ui.add_space(10.0);
                    if queue.is_confirming() {
                        ui.spinner();
                    } else if ui.button("Nice!").clicked() {
                        self.intents.push(Intent::AcknowledgeNotification);
                    }
                });
            });
    }
}
