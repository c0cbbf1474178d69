//! Win32 window enumeration and control.

use std::ffi::c_void;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, WPARAM};
use windows::Win32::Graphics::Dwm::{DWMWA_CLOAKED, DwmGetWindowAttribute};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClassNameW, GetWindowTextW, GetWindowThreadProcessId, IsIconic, IsWindow,
    IsWindowVisible, PostMessageW, SW_MAXIMIZE, SW_MINIMIZE, SW_RESTORE, SetForegroundWindow,
    ShowWindow, WM_CLOSE,
};

use super::{RawWindow, WindowControl, WindowSource};
use crate::engine::types::WindowHandle;
use crate::error::PieslotError;

const TEXT_BUFFER_LEN: usize = 512;

#[allow(clippy::cast_possible_truncation)]
fn to_hwnd(handle: WindowHandle) -> HWND { HWND(handle.raw() as isize as *mut c_void) }

fn from_hwnd(hwnd: HWND) -> WindowHandle { WindowHandle(hwnd.0 as isize as i64) }

fn read_text(hwnd: HWND, read: fn(HWND, &mut [u16]) -> i32) -> String {
    let mut buffer = [0u16; TEXT_BUFFER_LEN];
    let len = read(hwnd, &mut buffer);
    let len = usize::try_from(len).unwrap_or(0).min(TEXT_BUFFER_LEN);
    String::from_utf16_lossy(&buffer[..len])
}

fn is_cloaked(hwnd: HWND) -> bool {
    let mut cloaked: u32 = 0;
    let result = unsafe {
        DwmGetWindowAttribute(
            hwnd,
            DWMWA_CLOAKED,
            std::ptr::addr_of_mut!(cloaked).cast(),
            u32::try_from(std::mem::size_of::<u32>()).unwrap_or(4),
        )
    };
    result.is_ok() && cloaked != 0
}

fn describe(hwnd: HWND) -> RawWindow {
    let mut pid: u32 = 0;
    unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };

    RawWindow {
        handle: from_hwnd(hwnd),
        visible: unsafe { IsWindowVisible(hwnd) }.as_bool(),
        cloaked: is_cloaked(hwnd),
        title: read_text(hwnd, |h, buf| unsafe { GetWindowTextW(h, buf) }),
        class_name: read_text(hwnd, |h, buf| unsafe { GetClassNameW(h, buf) }),
        owner_pid: pid,
    }
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = unsafe { &mut *(lparam.0 as *mut Vec<HWND>) };
    handles.push(hwnd);
    BOOL(1)
}

/// Enumerates top-level windows with `EnumWindows`.
#[derive(Debug, Default)]
pub struct Win32WindowSource;

impl WindowSource for Win32WindowSource {
    fn enumerate(&self) -> Vec<RawWindow> {
        let mut handles: Vec<HWND> = Vec::new();
        let result = unsafe {
            EnumWindows(Some(collect_window), LPARAM(std::ptr::addr_of_mut!(handles) as isize))
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, "EnumWindows failed");
            return Vec::new();
        }

        handles.into_iter().map(describe).collect()
    }
}

/// Manipulates windows through `user32`.
#[derive(Debug, Default)]
pub struct Win32WindowControl;

impl Win32WindowControl {
    fn live(handle: WindowHandle) -> Result<HWND, PieslotError> {
        let hwnd = to_hwnd(handle);
        if handle.is_window() && unsafe { IsWindow(hwnd) }.as_bool() {
            Ok(hwnd)
        } else {
            Err(PieslotError::PlatformError(format!("window {handle} no longer exists")))
        }
    }
}

impl WindowControl for Win32WindowControl {
    fn focus(&self, handle: WindowHandle) -> Result<(), PieslotError> {
        let hwnd = Self::live(handle)?;
        unsafe {
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            if SetForegroundWindow(hwnd).as_bool() {
                Ok(())
            } else {
                Err(PieslotError::PlatformError(format!("could not focus window {handle}")))
            }
        }
    }

    fn minimize(&self, handle: WindowHandle) -> Result<(), PieslotError> {
        let hwnd = Self::live(handle)?;
        let _ = unsafe { ShowWindow(hwnd, SW_MINIMIZE) };
        Ok(())
    }

    fn maximize(&self, handle: WindowHandle) -> Result<(), PieslotError> {
        let hwnd = Self::live(handle)?;
        let _ = unsafe { ShowWindow(hwnd, SW_MAXIMIZE) };
        Ok(())
    }

    fn close(&self, handle: WindowHandle) -> Result<(), PieslotError> {
        let hwnd = Self::live(handle)?;
        unsafe { PostMessageW(hwnd, WM_CLOSE, WPARAM(0), LPARAM(0)) }
            .map_err(|err| PieslotError::PlatformError(format!("could not close window {handle}: {err}")))
    }
}
