// Win32 Platform Services
//
// Clipboard, SendInput, keyboard layout and RegisterHotKey backed
// implementations of the platform traits, plus the thread message loop
// that delivers WM_HOTKEY.
//
// Hotkeys are registered without a window, so WM_HOTKEY lands in the
// queue of the thread that registered them. Register and run the
// MessageLoop on the same thread.

use std::mem::size_of;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{HGLOBAL, HWND, LPARAM, WPARAM};
use windows::Win32::System::DataExchange::{
    CloseClipboard, GetClipboardData, GetClipboardSequenceNumber, OpenClipboard,
};
use windows::Win32::System::Memory::{GlobalLock, GlobalUnlock};
use windows::Win32::System::Ole::CF_UNICODETEXT;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyboardLayout, LoadKeyboardLayoutW, RegisterHotKey, SendInput, UnregisterHotKey,
    HOT_KEY_MODIFIERS, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, KLF_REORDER, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
    MOD_SHIFT, MOD_WIN, VIRTUAL_KEY, VK_A, VK_C, VK_CONTROL, VK_HOME, VK_LWIN, VK_MENU,
    VK_RWIN, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetMessageW, GetWindowThreadProcessId, MessageBoxW, PostMessageW,
    PostThreadMessageW, HWND_BROADCAST, MB_ICONERROR, MB_OK, MSG, WM_HOTKEY,
    WM_INPUTLANGCHANGEREQUEST, WM_QUIT,
};

use super::provider::{ClipboardService, HotkeyService, InputService, LayoutService, PlatformError};
use crate::hotkey::{HotkeyBinding, Modifier, Modifiers};
use crate::layout::LayoutId;

/// Null-terminated UTF-16 copy of `s`
fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn key_event(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn unicode_event(unit: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(0),
                wScan: unit,
                dwFlags: KEYEVENTF_UNICODE | flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Press `modifier`, tap `key`, release `modifier`
fn chord(modifier: VIRTUAL_KEY, key: VIRTUAL_KEY) -> [INPUT; 4] {
    [
        key_event(modifier, KEYBD_EVENT_FLAGS(0)),
        key_event(key, KEYBD_EVENT_FLAGS(0)),
        key_event(key, KEYEVENTF_KEYUP),
        key_event(modifier, KEYEVENTF_KEYUP),
    ]
}

fn send(inputs: &[INPUT]) -> Result<(), PlatformError> {
    if inputs.is_empty() {
        return Ok(());
    }
    let sent = unsafe { SendInput(inputs, size_of::<INPUT>() as i32) };
    if sent as usize == inputs.len() {
        Ok(())
    } else {
        Err(PlatformError::Input(format!(
            "{} of {} events delivered",
            sent,
            inputs.len()
        )))
    }
}

/// System clipboard
#[derive(Debug, Default)]
pub struct Win32Clipboard;

impl Win32Clipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardService for Win32Clipboard {
    fn sequence_number(&self) -> u32 {
        unsafe { GetClipboardSequenceNumber() }
    }

    fn read_text(&mut self) -> Result<String, PlatformError> {
        unsafe {
            OpenClipboard(HWND::default())
                .map_err(|e| PlatformError::Clipboard(format!("open failed: {}", e)))?;
            let text = read_unicode_text();
            let _ = CloseClipboard();
            text
        }
    }
}

/// Read CF_UNICODETEXT; the clipboard must be open
unsafe fn read_unicode_text() -> Result<String, PlatformError> {
    let handle = GetClipboardData(CF_UNICODETEXT.0 as u32)
        .map_err(|e| PlatformError::Clipboard(format!("no text: {}", e)))?;
    let global = HGLOBAL(handle.0);
    let ptr = GlobalLock(global) as *const u16;
    if ptr.is_null() {
        return Err(PlatformError::Clipboard("lock failed".to_string()));
    }
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let text = String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len));
    let _ = GlobalUnlock(global);
    Ok(text)
}

/// Synthetic keyboard input via SendInput
#[derive(Debug, Default)]
pub struct Win32Input;

impl Win32Input {
    pub fn new() -> Self {
        Self
    }
}

impl InputService for Win32Input {
    fn release_modifiers(&mut self, modifiers: &Modifiers) -> Result<(), PlatformError> {
        let mut ups = Vec::with_capacity(5);
        for modifier in modifiers.iter() {
            match modifier {
                Modifier::Ctrl => ups.push(key_event(VK_CONTROL, KEYEVENTF_KEYUP)),
                Modifier::Alt => ups.push(key_event(VK_MENU, KEYEVENTF_KEYUP)),
                Modifier::Shift => ups.push(key_event(VK_SHIFT, KEYEVENTF_KEYUP)),
                Modifier::Win => {
                    ups.push(key_event(VK_LWIN, KEYEVENTF_KEYUP));
                    ups.push(key_event(VK_RWIN, KEYEVENTF_KEYUP));
                }
            }
        }
        send(&ups)
    }

    fn send_copy(&mut self) -> Result<(), PlatformError> {
        send(&chord(VK_CONTROL, VK_C))
    }

    fn select_line(&mut self) -> Result<(), PlatformError> {
        send(&chord(VK_SHIFT, VK_HOME))
    }

    fn select_all(&mut self) -> Result<(), PlatformError> {
        send(&chord(VK_CONTROL, VK_A))
    }

    fn type_text(&mut self, text: &str) -> Result<(), PlatformError> {
        // Characters outside the BMP go out as two surrogate events
        let mut events = Vec::with_capacity(text.len() * 2);
        for unit in text.encode_utf16() {
            events.push(unicode_event(unit, KEYBD_EVENT_FLAGS(0)));
            events.push(unicode_event(unit, KEYEVENTF_KEYUP));
        }
        send(&events)
    }
}

/// Foreground keyboard layout queries and switching
#[derive(Debug, Default)]
pub struct Win32Layouts;

impl Win32Layouts {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutService for Win32Layouts {
    fn foreground_layout(&self) -> Option<LayoutId> {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.0.is_null() {
                return None;
            }
            let thread = GetWindowThreadProcessId(hwnd, None);
            let hkl = GetKeyboardLayout(thread);
            // Low word is the language id
            Some(LayoutId::new((hkl.0 as usize & 0xFFFF) as u16))
        }
    }

    fn request_switch(&mut self, layout: LayoutId) -> bool {
        let klid = wide(&layout.klid());
        unsafe {
            let hkl = match LoadKeyboardLayoutW(PCWSTR(klid.as_ptr()), KLF_REORDER) {
                Ok(hkl) => hkl,
                Err(e) => {
                    log::debug!("LoadKeyboardLayoutW({}) failed: {}", layout.klid(), e);
                    return false;
                }
            };
            PostMessageW(
                HWND_BROADCAST,
                WM_INPUTLANGCHANGEREQUEST,
                WPARAM(0),
                LPARAM(hkl.0 as isize),
            )
            .is_ok()
        }
    }
}

/// Thread-bound global hotkeys
#[derive(Debug, Default)]
pub struct Win32Hotkeys;

impl Win32Hotkeys {
    pub fn new() -> Self {
        Self
    }
}

fn hotkey_modifiers(modifiers: &Modifiers) -> HOT_KEY_MODIFIERS {
    let mut flags = MOD_NOREPEAT;
    for modifier in modifiers.iter() {
        flags |= match modifier {
            Modifier::Ctrl => MOD_CONTROL,
            Modifier::Alt => MOD_ALT,
            Modifier::Shift => MOD_SHIFT,
            Modifier::Win => MOD_WIN,
        };
    }
    flags
}

impl HotkeyService for Win32Hotkeys {
    fn register(&mut self, binding: &HotkeyBinding) -> Result<(), PlatformError> {
        unsafe {
            RegisterHotKey(
                HWND::default(),
                binding.id,
                hotkey_modifiers(&binding.modifiers),
                binding.vk,
            )
        }
        .map_err(|e| PlatformError::Hotkey(e.to_string()))
    }

    fn unregister(&mut self, id: i32) {
        if let Err(e) = unsafe { UnregisterHotKey(HWND::default(), id) } {
            log::debug!("UnregisterHotKey({}) failed: {}", id, e);
        }
    }
}

/// Handle that stops a MessageLoop from another thread
#[derive(Debug, Clone, Copy)]
pub struct QuitHandle {
    thread_id: u32,
}

impl QuitHandle {
    /// Post WM_QUIT to the loop's thread
    pub fn quit(&self) {
        if let Err(e) = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            log::warn!("Failed to stop message loop: {}", e);
        }
    }
}

/// GetMessage loop of the current thread
#[derive(Debug)]
pub struct MessageLoop {
    thread_id: u32,
}

impl Default for MessageLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLoop {
    /// Bind to the calling thread
    pub fn new() -> Self {
        Self {
            thread_id: unsafe { GetCurrentThreadId() },
        }
    }

    pub fn quit_handle(&self) -> QuitHandle {
        QuitHandle {
            thread_id: self.thread_id,
        }
    }

    /// Pump messages until WM_QUIT, handing every WM_HOTKEY id to `on_hotkey`
    pub fn run(&self, mut on_hotkey: impl FnMut(i32)) {
        let mut msg = MSG::default();
        loop {
            let ret = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };
            match ret.0 {
                0 => break,
                -1 => {
                    log::error!("GetMessageW failed");
                    break;
                }
                _ => {}
            }
            if msg.message == WM_HOTKEY {
                on_hotkey(msg.wParam.0 as i32);
            }
        }
        log::debug!("message loop finished");
    }
}

/// Blocking error notification
pub fn show_fatal_error(title: &str, message: &str) {
    let text = wide(message);
    let caption = wide(title);
    unsafe {
        MessageBoxW(
            HWND::default(),
            PCWSTR(text.as_ptr()),
            PCWSTR(caption.as_ptr()),
            MB_OK | MB_ICONERROR,
        );
    }
}
