//! Direct command handlers: uploads, flags, memory access and info

extern crate alloc;

use alloc::format;
use td_model::protocol::{
    FILE_LOADED, PROMPT_TESTDATA_LENGTH, firmware_length_prompt, transfer_firmware_message,
    transfer_testdata_message,
};
use td_model::{FIRMWARE_MAX_COUNT, ScriptBuffer, ShellError, TransportError, Width};

use super::commands::COMMANDS;
use super::hexdump::render;
use super::ingest::{allocate, receive_into};
use super::numbers::{command_args, first_number, to_address};
use super::{Shell, VERSION};

const COUNT_MISMATCH: &str = "Error: Number of array elements returned didn't match\n";

impl Shell<'_> {
    /// Print `prompt` and read one number from the next input line
    fn prompt_number(&mut self, prompt: &str) -> Result<i64, ShellError> {
        self.print(prompt);
        self.flush();
        let line = self
            .stream
            .read_line()?
            .ok_or(TransportError::ConnectionLost)?;
        let value = first_number(&line);
        log::debug!("prompt {prompt:?} -> {value}");
        Ok(value)
    }

    /// Read an upload length; zero or negative is refused before anything is allocated
    fn prompt_length(&mut self, prompt: &str) -> Result<usize, ShellError> {
        let value = self.prompt_number(prompt)?;
        match usize::try_from(value) {
            Ok(len) if len > 0 => Ok(len),
            _ => {
                self.print(&format!("Invalid length: {value}\n"));
                Err(ShellError::InvalidArgument(format!("invalid length {value}")))
            }
        }
    }

    pub(super) fn upload_test_data(&mut self) -> Result<(), ShellError> {
        self.state.direct_command = false;

        let len = self.prompt_length(PROMPT_TESTDATA_LENGTH)?;
        self.print(&transfer_testdata_message(len));
        self.print("\n");
        self.flush();

        let result = allocate(len).and_then(|mut buf| {
            // Previous unexecuted script is released before the new one arrives
            self.state.script = None;
            receive_into(&mut *self.stream, &mut buf)?;
            Ok(buf)
        });
        let buf = result.map_err(|e| self.download_failed(e))?;

        self.state.script = Some(ScriptBuffer::new(buf));
        self.state.direct_command = false;
        log::info!("Test data file received ({len} bytes)");
        self.print(FILE_LOADED);
        self.print("\n");
        Ok(())
    }

    pub(super) fn upload_firmware(&mut self) -> Result<(), ShellError> {
        self.state.direct_command = false;

        if self.system.firmware().is_full() {
            self.print(&format!("Already {FIRMWARE_MAX_COUNT} firmware files exist.\n"));
            return Err(ShellError::CapacityExceeded {
                max: FIRMWARE_MAX_COUNT,
            });
        }

        let number = self.system.firmware().count() + 1;
        let len = self.prompt_length(&firmware_length_prompt(number))?;
        self.print(&transfer_firmware_message(number, len));
        self.print("\n");
        self.flush();

        if self.system.firmware().is_full() {
            self.print(&format!(
                "ERROR Downloading Firmware: Limit reached. \
                 FIRMWARE_MAX_COUNT = {FIRMWARE_MAX_COUNT}\n"
            ));
            return Err(ShellError::CapacityExceeded {
                max: FIRMWARE_MAX_COUNT,
            });
        }

        let mut buf = allocate(len).map_err(|e| self.download_failed(e))?;
        let index = self.system.firmware().count();
        let remaining = self.system.firmware().remaining() - 1;
        self.print(&format!(
            "Downloading Firmware into Firmware Buffer {index}, \
             Remaining Firmware Buffers = {remaining}\n"
        ));
        self.flush();

        receive_into(&mut *self.stream, &mut buf).map_err(|e| self.download_failed(e))?;
        let count = self
            .system
            .firmware_mut()
            .add(buf)
            .map_err(|e| self.download_failed(e))?;

        log::info!("Firmware {count} received ({len} bytes)");
        self.print(FILE_LOADED);
        self.print("\n");
        Ok(())
    }

    fn download_failed(&mut self, err: ShellError) -> ShellError {
        log::error!("Download failed: {err}");
        if let ShellError::AllocationFailure { size } = err {
            self.print(&format!("Failed to allocate memory size = {size}\n"));
        }
        self.print("fatal error: Download failed\n");
        err
    }

    pub(super) fn set_debug_mode(&mut self) -> Result<(), ShellError> {
        let on = self.prompt_number("Test Driver DEBUG Mode (1-ON 0-OFF) : ")? != 0;
        self.state.debug_mode = on;
        self.system.set_debug_mode(on);
        self.print(&format!("DEBUG Mode = {}\n", u8::from(on)));
        Ok(())
    }

    pub(super) fn set_timestamps(&mut self) -> Result<(), ShellError> {
        let off = self.prompt_number("Tracer - Turn OFF time stamps? (1-YES 0-NO) : ")? != 0;
        self.state.suppress_timestamps = off;
        self.print(&format!("NoTimestampOnTraces = {}\n", u8::from(off)));
        Ok(())
    }

    pub(super) fn set_print_hardware_lines(&mut self) -> Result<(), ShellError> {
        let on = self.prompt_number("Debug - Print Hardware Lines Status? (1-YES 0-NO) : ")? != 0;
        self.state.print_hardware_lines = on;
        self.system.set_print_hardware_lines(on);
        self.print(&format!(
            "Debug - Print Hardware Lines Status = {}\n",
            u8::from(on)
        ));
        Ok(())
    }

    /// `md addr count width`
    pub(super) fn memory_dump(&mut self, line: &str) -> Result<(), ShellError> {
        let args = command_args(line, 4).inspect_err(|_| self.print(COUNT_MISMATCH))?;
        let mut addr = to_address(args[0]).inspect_err(|e| self.print_error(e))?;

        let mut count = usize::try_from(args[1])
            .map_err(|_| ShellError::InvalidArgument(format!("invalid count: {}", args[1])))
            .inspect_err(|e| self.print_error(e))?;
        if count > self.config.max_dump_bytes {
            count = self.config.max_dump_bytes;
            self.print(&format!("\nMax dump size = {count}"));
        }

        let requested = if args[2] == 0 { 1 } else { args[2] };
        let Some(width) = usize::try_from(requested).ok().and_then(Width::from_bytes) else {
            self.print(&format!("\nInvalid width: {requested}\n"));
            return Err(ShellError::InvalidArgument(format!("invalid width {requested}")));
        };

        if !width.is_aligned(addr) {
            addr = width.align_down(addr);
            self.print(&format!(
                "\nAligning offset for {}-byte access = 0x{addr:08x}",
                width.bytes()
            ));
        }
        self.print("\n");

        match render(self.system.memory(), addr, count, addr, width, 1) {
            Ok(text) => {
                self.print(&text);
                Ok(())
            }
            Err(e) => {
                self.print(&format!("Error: {e}\n"));
                Err(e.into())
            }
        }
    }

    /// `mr addr`
    pub(super) fn memory_read(&mut self, line: &str) -> Result<(), ShellError> {
        let args = command_args(line, 2).inspect_err(|_| self.print(COUNT_MISMATCH))?;
        let addr = to_address(args[0]).inspect_err(|e| self.print_error(e))?;
        match self.system.memory().read(addr, Width::Word) {
            Ok(value) => {
                self.print(&format!("0x{value:08X}\n"));
                Ok(())
            }
            Err(e) => {
                self.print(&format!("Error: {e}\n"));
                Err(e.into())
            }
        }
    }

    /// `mw addr value`
    pub(super) fn memory_write(&mut self, line: &str) -> Result<(), ShellError> {
        let args = command_args(line, 3).inspect_err(|_| self.print(COUNT_MISMATCH))?;
        let addr = to_address(args[0]).inspect_err(|e| self.print_error(e))?;
        // Only the low 32 bits are written
        let value = args[1] as u32;
        if let Err(e) = self.system.memory().write(addr, Width::Word, value) {
            self.print(&format!("Error: {e}\n"));
            return Err(e.into());
        }
        Ok(())
    }

    fn print_error(&mut self, err: &ShellError) {
        self.print(&format!("Error: {err}\n"));
    }

    pub(super) fn exit(&mut self) {
        if self.config.allow_exit {
            self.state.exit_requested = true;
        } else {
            log::info!("exit refused: shell is the init process or its child");
            self.print("Exit not permitted\n");
        }
    }

    pub(super) fn linux(&mut self) -> Result<(), ShellError> {
        self.flush();
        self.system.spawn_system_shell().map_err(|e| {
            log::error!("System shell failed: {e}");
            ShellError::Transport(e)
        })
    }

    pub(super) fn print_version(&mut self) {
        self.print(&format!("Test Driver v{VERSION}\n"));
    }

    pub(super) fn print_usage(&mut self) {
        self.print("\nTest Driver Shell\n\n");
        self.print_version();
        self.print("Available Commands:\n");
        for entry in COMMANDS {
            self.print(&format!("{:<22} {}\n", entry.name, entry.description));
        }
        self.print("\n");
    }
}
