//! Browser automation module
//!
//! The `BrowserDriver` trait plus its agent-browser and in-memory backends.

pub mod agent_browser;
pub mod driver;
pub mod memory;
pub mod retry;
pub mod scripts;

pub use agent_browser::AgentBrowserDriver;
pub use driver::{
    BrowserDriver, ConsoleEntry, ConsoleLevel, ElementDescriptor, ElementRef, InteractiveElements,
    PageElement, PageState,
};
pub use memory::{MemoryDriver, MemoryPage};
pub use retry::RetryPolicy;
