/// Vulkan Debug Messenger - routes validation layer messages to the engine logger
///
/// Compiled only with the `vulkan-validation` feature. Messages are logged
/// under `flint::vulkan::Validation` with a severity matching the layer's, and
/// counted in global atomic statistics.

use ash::vk;
use colored::*;
use flint_engine::{engine_debug, engine_error, engine_trace, engine_warn};
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};

const SOURCE: &str = "flint::vulkan::Validation";

/// Counters indexed by `Bucket`
static COUNTERS: [AtomicU32; 4] = [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)];

#[derive(Clone, Copy)]
enum Bucket {
    Error = 0,
    Warning = 1,
    Info = 2,
    Verbose = 3,
}

impl Bucket {
    fn of(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Bucket::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Bucket::Warning
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Bucket::Info
        } else {
            Bucket::Verbose
        }
    }

    fn count(self) {
        COUNTERS[self as usize].fetch_add(1, Ordering::Relaxed);
    }
}

/// Validation message counts since the last device with validation was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    /// True when the layers reported neither errors nor warnings
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }
}

pub(crate) fn reset_validation_stats() {
    for counter in &COUNTERS {
        counter.store(0, Ordering::Relaxed);
    }
}

pub fn get_validation_stats() -> ValidationStats {
    let load = |bucket: Bucket| COUNTERS[bucket as usize].load(Ordering::Relaxed);
    ValidationStats {
        errors: load(Bucket::Error),
        warnings: load(Bucket::Warning),
        info: load(Bucket::Info),
        verbose: load(Bucket::Verbose),
    }
}

/// Print the validation counters to stdout, typically at shutdown
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();
    if stats.total() == 0 {
        println!("{}", "Vulkan validation: no messages".green().bold());
        return;
    }

    println!("{}", "Vulkan validation report".bright_blue().bold());
    let rows = [
        ("errors", stats.errors, Color::Red),
        ("warnings", stats.warnings, Color::Yellow),
        ("info", stats.info, Color::Cyan),
        ("verbose", stats.verbose, Color::BrightBlack),
    ];
    for (label, count, color) in rows.iter().filter(|row| row.1 > 0) {
        println!("  {:<9} {}", label.color(*color), count);
    }
    println!("  {:<9} {}", "total".bold(), stats.total());
}

/// Severity flags the messenger subscribes to
pub(crate) fn messenger_create_info<'a>() -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
}

/// Messenger callback; never asks the driver to abort the call
///
/// # Safety
///
/// Called by the Vulkan loader with valid callback data.
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    let kind = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    let bucket = Bucket::of(message_severity);
    bucket.count();
    match bucket {
        Bucket::Error => engine_error!(SOURCE, "[{}] {}: {}", kind, message_id_name, message),
        Bucket::Warning => engine_warn!(SOURCE, "[{}] {}: {}", kind, message_id_name, message),
        Bucket::Info => engine_debug!(SOURCE, "[{}] {}: {}", kind, message_id_name, message),
        Bucket::Verbose => engine_trace!(SOURCE, "[{}] {}: {}", kind, message_id_name, message),
    }

    vk::FALSE
}
