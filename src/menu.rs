//! Interactive console menu.
//!
//! The menu only gathers settings; the scrape itself runs through a
//! [`Launcher`], so the menu can be driven from any reader and writer.

use crate::config::{ScrapeTarget, Settings};
use crate::error::Result;
use crate::scrape::{ScrapeJob, ScrapeSummary};
use crate::types::CaptureMode;
use std::io::{BufRead, Write};

/// Runs a scrape with the settings chosen in the menu.
pub trait Launcher {
    fn launch(&mut self, settings: &Settings, job: ScrapeJob) -> Result<ScrapeSummary>;
}

impl<L: Launcher + ?Sized> Launcher for &mut L {
    fn launch(&mut self, settings: &Settings, job: ScrapeJob) -> Result<ScrapeSummary> {
        (**self).launch(settings, job)
    }
}

#[derive(Debug, Clone, Copy)]
enum HelpTopic {
    General,
    Settings,
    ScrapeType,
    CaptureMode,
}

enum Input {
    Number(i64),
    Invalid,
    Eof,
}

/// Whether the menu should keep running after a submenu returns.
type KeepGoing = bool;

pub struct Menu<R, W, L> {
    input: R,
    output: W,
    launcher: L,
    settings: Settings,
    max_workers: usize,
}

impl<R: BufRead, W: Write, L: Launcher> Menu<R, W, L> {
    pub fn new(input: R, output: W, launcher: L, settings: Settings) -> Self {
        let max_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            input,
            output,
            launcher,
            settings,
            max_workers,
        }
    }

    /// Upper bound offered when choosing the worker count.
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Show the main menu until the user exits or input ends.
    pub fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.output, "Welcome to the StreetView scraper\n")?;
            writeln!(self.output, "{}\n", "---".repeat(10))?;
            writeln!(self.output, "*** StreetView Scraper ***")?;
            writeln!(self.output, "0) Help")?;
            writeln!(self.output, "1) Settings")?;
            writeln!(self.output, "2) Start Scrape")?;
            writeln!(self.output, "3) Exit")?;

            let keep_going = match self.read_choice()? {
                Input::Eof | Input::Number(3) => false,
                Input::Number(1) => self.settings_menu()?,
                Input::Number(2) => self.start()?,
                _ => {
                    self.help(HelpTopic::General)?;
                    true
                }
            };
            if !keep_going {
                return Ok(());
            }
        }
    }

    fn settings_menu(&mut self) -> Result<KeepGoing> {
        loop {
            writeln!(self.output, "*** Settings ***")?;
            writeln!(self.output, "0) Help")?;
            writeln!(self.output, "1) Set API key")?;
            writeln!(self.output, "2) Configure Scrape")?;
            writeln!(self.output, "3) Back")?;

            match self.read_choice()? {
                Input::Eof => return Ok(false),
                Input::Number(3) => return Ok(true),
                Input::Number(1) => {
                    if !self.set_api_key()? {
                        return Ok(false);
                    }
                }
                Input::Number(2) => {
                    if !self.configure_scrape()? {
                        return Ok(false);
                    }
                }
                _ => self.help(HelpTopic::Settings)?,
            }
        }
    }

    fn set_api_key(&mut self) -> Result<KeepGoing> {
        let Some(key) = self.read_line("Enter your API key: ")? else {
            return Ok(false);
        };
        let key = key.trim();
        if key.is_empty() {
            writeln!(self.output, "No key entered, keeping the current one.")?;
        } else {
            self.settings.api_key = Some(key.to_string());
            writeln!(self.output, "Key Set!")?;
        }
        Ok(true)
    }

    fn configure_scrape(&mut self) -> Result<KeepGoing> {
        writeln!(self.output, "*** Configure Scrape ***")?;

        loop {
            writeln!(self.output, "How would you like to scrape?")?;
            writeln!(self.output, "0) Help")?;
            writeln!(self.output, "1) Scrape Individual Countries")?;
            writeln!(self.output, "2) Mass Scrape from File")?;
            writeln!(self.output, "3) Next")?;
            match self.read_choice()? {
                Input::Eof => return Ok(false),
                Input::Number(1) => self.settings.target = ScrapeTarget::SingleCountry,
                Input::Number(2) => self.settings.target = ScrapeTarget::CountryList,
                Input::Number(3) => {}
                _ => {
                    self.help(HelpTopic::ScrapeType)?;
                    continue;
                }
            }
            break;
        }

        loop {
            writeln!(
                self.output,
                "Would you like to capture a panorama at each point? Or would you only like a single image per point?"
            )?;
            writeln!(self.output, "0) Help")?;
            writeln!(self.output, "1) Panorama")?;
            writeln!(self.output, "2) Single Image")?;
            writeln!(self.output, "3) Next")?;
            match self.read_choice()? {
                Input::Eof => return Ok(false),
                Input::Number(1) => self.settings.capture = CaptureMode::Panorama,
                Input::Number(2) => self.settings.capture = CaptureMode::Single,
                Input::Number(3) => {}
                _ => {
                    self.help(HelpTopic::CaptureMode)?;
                    continue;
                }
            }
            break;
        }

        loop {
            writeln!(self.output, "How many locations would you like to sample from each country?")?;
            match self.read_choice()? {
                Input::Eof => return Ok(false),
                Input::Number(n) if n != 0 => {
                    self.settings.samples_per_country =
                        usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
                    break;
                }
                _ => writeln!(self.output, "Please enter a valid number.")?,
            }
        }

        loop {
            writeln!(self.output, "How many threads would you like to use?")?;
            match self.read_choice()? {
                Input::Eof => return Ok(false),
                Input::Number(n)
                    if (1..=self.max_workers as u64).contains(&n.unsigned_abs()) =>
                {
                    self.settings.workers = n.unsigned_abs() as usize;
                    break;
                }
                _ => writeln!(
                    self.output,
                    "Please enter a valid number between 1 and {}.",
                    self.max_workers
                )?,
            }
        }

        Ok(true)
    }

    fn start(&mut self) -> Result<KeepGoing> {
        if !self.settings.has_api_key() {
            writeln!(
                self.output,
                "No API key set. Add MAPS_API_KEY to .env or use Settings > Set API key."
            )?;
            return Ok(true);
        }
        writeln!(self.output, "*** Starting Scrape ***")?;

        let job = match self.settings.target {
            ScrapeTarget::CountryList => ScrapeJob::CountryList,
            ScrapeTarget::SingleCountry => {
                let Some(name) = self.read_line("What country would you like to scrape: ")? else {
                    return Ok(false);
                };
                let name = name.trim();
                if name.is_empty() {
                    writeln!(self.output, "No country entered.")?;
                    return Ok(true);
                }
                ScrapeJob::Country(name.to_string())
            }
        };

        match self.launcher.launch(&self.settings, job) {
            Ok(summary) => {
                for report in &summary.countries {
                    writeln!(self.output, "Scrape completed for {}", report.country)?;
                    writeln!(self.output, "{report}\n")?;
                }
            }
            Err(e) => writeln!(self.output, "Error scraping images: {e}")?,
        }
        Ok(true)
    }

    fn help(&mut self, topic: HelpTopic) -> Result<()> {
        let text = match topic {
            HelpTopic::General => {
                "This is a tool for scraping images from Google Street View.\n\
                 Before you run a scrape, configure your settings.\n\
                 *** Commands ***\n\
                 --- 0) Help\n------- Displays this help menu.\n\
                 --- 1) Settings\n------- Configure settings for your scrape (API key, scrape type, etc.).\n\
                 --- 2) Start Scrape\n------- Start the scrape using the current settings.\n\
                 --- 3) Exit\n------- Exits the application."
            }
            HelpTopic::Settings => {
                "Settings allow you to configure key parameters for the scraper.\n\
                 1) Set API Key: Input your Google Maps API key, which is required to use the Street View API.\n\
                 2) Configure Scrape: Choose individual countries or a country list file, the capture mode, \
                 the number of samples per country and the number of concurrent downloads.\n\
                 3) Back: Return to the main menu."
            }
            HelpTopic::ScrapeType => {
                "Scraping configuration options define how the scraper will behave.\n\
                 1) Scrape Individual Countries: Enter the name of a country when the scrape starts.\n\
                 2) Mass Scrape from File: Scrape every country listed in countries_to_scrape.txt.\n\
                 3) Next: Keep the current choice."
            }
            HelpTopic::CaptureMode => {
                "You can capture panorama images or single images at each location.\n\
                 1) Panorama: Capture images at several headings around each point (N, E, S, W).\n\
                 2) Single Image: Capture only one image per point.\n\
                 3) Next: Keep the current choice."
            }
        };
        writeln!(self.output, "{text}\n")?;
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn read_choice(&mut self) -> Result<Input> {
        Ok(match self.read_line("> ")? {
            None => Input::Eof,
            Some(line) => match line.trim().parse() {
                Ok(n) => Input::Number(n),
                Err(_) => Input::Invalid,
            },
        })
    }
}
