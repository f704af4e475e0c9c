mod cli;
mod emu_net;
