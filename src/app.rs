use std::sync::{mpsc::Receiver, Arc};

use eframe::egui;

use crate::fetcher::Snapshot;
use crate::icon;
use crate::status::Readout;

/// Renders the latest readout and keeps the window icon in sync with the
/// battery charge. Snapshots arrive from the poller thread; this side only
/// ever consumes them.
pub struct MonitorApp {
    rx: Receiver<Snapshot>,
    readout: Readout,
}

impl MonitorApp {
    pub fn new(rx: Receiver<Snapshot>) -> MonitorApp {
        return MonitorApp {
            rx,
            readout: Readout::new(),
        };
    }

    fn render_fields(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("UPS Status");
        });
        ui.separator();

        ui.label(egui::RichText::new(format!("UPS Status: {}", self.readout.status)).strong());
        ui.add_space(4.0);

        field_row(ui, "Battery Charge:", &format!("{}%", self.readout.charge_text));
        ui.add(level_bar(self.readout.charge, false));
        ui.add_space(4.0);

        field_row(
            ui,
            "Estimated Runtime:",
            &format!("{} minutes", self.readout.runtime_minutes),
        );
        field_row(ui, "Input Voltage:", &format!("{} V", self.readout.input_voltage));
        field_row(ui, "Output Voltage:", &format!("{} V", self.readout.output_voltage));

        field_row(ui, "UPS Load:", &format!("{}%", self.readout.load_text));
        ui.add(level_bar(self.readout.load, true));

        ui.separator();

        field_row(ui, "Manufacturer:", &self.readout.manufacturer);
        field_row(ui, "Model:", &self.readout.model);
        field_row(ui, "Serial Number:", &self.readout.serial);
        field_row(ui, "Last Test Result:", &self.readout.test_result);
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut refreshed = false;
        while let Ok(data) = self.rx.try_recv() {
            self.readout = Readout::from_snapshot(&data);
            refreshed = true;
        }
        if refreshed {
            let charge = self.readout.charge.unwrap_or(0);
            ctx.send_viewport_cmd(egui::ViewportCommand::Icon(Some(Arc::new(
                icon::battery_icon(charge),
            ))));
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Hide").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
                }
                if ui.button("Exit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_fields(ui);
        });
    }
}

fn field_row(ui: &mut egui::Ui, label: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(label).strong());
        ui.label(value);
    });
}

// A value that failed to parse shows an uncolored empty bar while the label
// keeps the raw text.
fn level_bar(value: Option<i64>, reverse: bool) -> egui::ProgressBar {
    match value {
        Some(value) => egui::ProgressBar::new(value.clamp(0, 100) as f32 / 100.0)
            .fill(icon::color_from_value(value, reverse)),
        None => egui::ProgressBar::new(0.0),
    }
}
