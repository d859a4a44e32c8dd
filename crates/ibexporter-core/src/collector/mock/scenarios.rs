//! Captured tool output and pre-built mock fabrics for testing.
//!
//! The texts reproduce what `ibnetdiscover --ports`, `perfquery` and
//! `ibswinfo` print on a small fabric: two leaf switches (LID 1719 and 2052)
//! and three host channel adapters.

use super::runner::MockRunner;

/// `ibnetdiscover --ports` for two switches and three HCAs. The last line is an
/// unconnected switch port.
pub const IBNETDISCOVER: &str = "\
CA   134  1 0x7cfe9003003b4bde 4x EDR - SW  1719 10 0x7cfe9003009ce5b0 ( 'o0001 HCA-1' - 'ib-i1l1s01' )
CA   133  1 0x7cfe9003003b4b96 4x EDR - SW  1719 11 0x7cfe9003009ce5b0 ( 'o0002 HCA-1' - 'ib-i1l1s01' )
CA  1432  1 0x506b4b0300cc02a6 4x EDR - SW  2052 35 0x506b4b03005c2740 ( 'p0001 HCA-1' - 'ib-i4l1s01' )
SW  1719 10 0x7cfe9003009ce5b0 4x EDR - CA   134  1 0x7cfe9003003b4bde ( 'ib-i1l1s01' - 'o0001 HCA-1' )
SW  1719 11 0x7cfe9003009ce5b0 4x EDR - CA   133  1 0x7cfe9003003b4b96 ( 'ib-i1l1s01' - 'o0002 HCA-1' )
SW  1719  1 0x7cfe9003009ce5b0 4x EDR - SW  1516  1 0x7cfe900300b07320 ( 'ib-i1l1s01' - 'ib-i1l2s01' )
SW  2052 35 0x506b4b03005c2740 4x EDR - CA  1432  1 0x506b4b0300cc02a6 ( 'ib-i4l1s01' - 'p0001 HCA-1' )
SW  2052 37 0x506b4b03005c2740 4x ???                                    'ib-i4l1s01'
";

/// `perfquery -l -x` on switch 0x7cfe9003009ce5b0, ports 1 and 2.
pub const PERFQUERY_SWITCH_1719: &str = "\
# Port extended counters: Lid 1719 port 1 (CapMask: 0x5300 CapMask2: 0x0000002)
PortSelect:......................1
CounterSelect:...................0x0000
PortXmitData:....................36298026860928
PortRcvData:.....................12279028775751
PortXmitPkts:....................101733204203
PortRcvPkts:.....................32262508468
PortUnicastXmitPkts:.............101708165289
PortUnicastRcvPkts:..............26677661727
PortMulticastXmitPkts:...........25038914
PortMulticastRcvPkts:............5584846741
SymbolErrorCounter:..............0
LinkErrorRecoveryCounter:........0
LinkDownedCounter:...............0
PortRcvErrors:...................0
PortRcvRemotePhysicalErrors:.....0
PortRcvSwitchRelayErrors:........0
PortXmitDiscards:................0
PortXmitConstraintErrors:........0
PortRcvConstraintErrors:.........0
LocalLinkIntegrityErrors:........0
ExcessiveBufferOverrunErrors:....0
VL15Dropped:.....................0
PortXmitWait:....................22730501
QP1Dropped:......................0
# Port extended counters: Lid 1719 port 2 (CapMask: 0x5300 CapMask2: 0x0000002)
PortSelect:......................2
CounterSelect:...................0x0000
PortXmitData:....................26006570014026
PortRcvData:.....................39078804993378
PortXmitPkts:....................122978948297
PortRcvPkts:.....................93660802641
PortUnicastXmitPkts:.............122978948297
PortUnicastRcvPkts:..............93660802641
PortMulticastXmitPkts:...........0
PortMulticastRcvPkts:............0
SymbolErrorCounter:..............0
LinkErrorRecoveryCounter:........0
LinkDownedCounter:...............0
PortRcvErrors:...................0
PortRcvRemotePhysicalErrors:.....0
PortRcvSwitchRelayErrors:........0
PortXmitDiscards:................0
PortXmitConstraintErrors:........0
PortRcvConstraintErrors:.........0
LocalLinkIntegrityErrors:........0
ExcessiveBufferOverrunErrors:....0
VL15Dropped:.....................0
PortXmitWait:....................36510964
QP1Dropped:......................0
";

/// `perfquery -l -x` on switch 0x506b4b03005c2740, port 1.
pub const PERFQUERY_SWITCH_2052: &str = "\
# Port extended counters: Lid 2052 port 1 (CapMask: 0x5300 CapMask2: 0x0000002)
PortSelect:......................1
CounterSelect:...................0x0000
PortXmitData:....................5678900011223
PortRcvData:.....................4455667788990
PortXmitPkts:....................23456789012
PortRcvPkts:.....................19876543210
PortUnicastXmitPkts:.............23456789012
PortUnicastRcvPkts:..............19876543210
PortMulticastXmitPkts:...........0
PortMulticastRcvPkts:............0
SymbolErrorCounter:..............0
LinkErrorRecoveryCounter:........0
LinkDownedCounter:...............0
PortRcvErrors:...................0
PortRcvRemotePhysicalErrors:.....0
PortRcvSwitchRelayErrors:........7
PortXmitDiscards:................0
PortXmitConstraintErrors:........0
PortRcvConstraintErrors:.........0
LocalLinkIntegrityErrors:........0
ExcessiveBufferOverrunErrors:....0
VL15Dropped:.....................0
PortXmitWait:....................1234567
QP1Dropped:......................0
";

/// `perfquery -l -x` on an HCA, port 1.
pub const PERFQUERY_HCA: &str = "\
# Port extended counters: Lid 134 port 1 (CapMask: 0x5300 CapMask2: 0x0000002)
PortSelect:......................1
CounterSelect:...................0x0000
PortXmitData:....................1234567890123
PortRcvData:.....................9876543210987
PortXmitPkts:....................4567890123
PortRcvPkts:.....................7890123456
PortUnicastXmitPkts:.............4567890123
PortUnicastRcvPkts:..............7890123400
PortMulticastXmitPkts:...........0
PortMulticastRcvPkts:............56
SymbolErrorCounter:..............0
LinkErrorRecoveryCounter:........0
LinkDownedCounter:...............0
PortRcvErrors:...................0
PortRcvRemotePhysicalErrors:.....0
PortRcvSwitchRelayErrors:........0
PortXmitDiscards:................0
PortXmitConstraintErrors:........0
PortRcvConstraintErrors:.........0
LocalLinkIntegrityErrors:........0
ExcessiveBufferOverrunErrors:....0
VL15Dropped:.....................0
PortXmitWait:....................0
QP1Dropped:......................0
";

/// `perfquery -E` (receive error details), port 1.
pub const PERFQUERY_RCV_ERR: &str = "\
# PortRcvErrorDetails counters: Lid 1719 port 1
PortSelect:......................1
CounterSelect:...................0x0000
PortLocalPhysicalErrors:.........0
PortMalformedPktErrors:..........0
PortBufferOverrunErrors:.........0
PortDLIDMappingErrors:...........0
PortVLMappingErrors:.............0
PortLoopingErrors:...............0
";

/// `perfquery -E` (receive error details), port 2.
pub const PERFQUERY_RCV_ERR_PORT2: &str = "\
# PortRcvErrorDetails counters: Lid 1719 port 2
PortSelect:......................2
CounterSelect:...................0x0000
PortLocalPhysicalErrors:.........3
PortMalformedPktErrors:..........0
PortBufferOverrunErrors:.........0
PortDLIDMappingErrors:...........0
PortVLMappingErrors:.............0
PortLoopingErrors:...............1
";

/// Extended counters with two unparseable values.
pub const PERFQUERY_BAD_VALUES: &str = "\
# Port extended counters: Lid 1719 port 1 (CapMask: 0x5300 CapMask2: 0x0000002)
PortSelect:......................1
CounterSelect:...................0x0000
PortXmitData:....................foo
PortRcvData:.....................bar
PortXmitPkts:....................101733204203
PortRcvPkts:.....................32262508468
";

/// `ibswinfo` on an SB7790 (LID 1719): chassis fan tray in ERROR.
pub const IBSWINFO_SB7790: &str = "\
=================================================
# MSB7790-ES2F [lid-1719]
=================================================
part number        | MSB7790-ES2F
serial number      | MT1943X00498
product name       | SB7790
revision           | A1
ports              | 36
PSID               | MT_1880110032
GUID               | 0x7cfe9003009ce5b0
firmware version   | 11.2008.2102
-------------------------------------------------
uptime (d-h:m:s)   | 160d-10:38:53
-------------------------------------------------
PSU0 status        | OK
     P/N           | MTEF-PSF-AC-A
     S/N           | MT1943X00149
     DC power      | OK
     fan status    | OK
     power (W)     | 72
PSU1 status        | OK
     P/N           | MTEF-PSF-AC-A
     S/N           | MT1943X00155
     DC power      | OK
     fan status    | OK
     power (W)     | 71
-------------------------------------------------
temperature (C)    | 45
max temp (C)       | 45
-------------------------------------------------
fan status         | ERROR
fan#1 (rpm)        | 8493
fan#2 (rpm)        | 7349
fan#3 (rpm)        | 8441
fan#4 (rpm)        | 7270
fan#5 (rpm)        | 8337
fan#6 (rpm)        | 7156
fan#7 (rpm)        | 8441
fan#8 (rpm)        | 7232
-------------------------------------------------
";

/// `ibswinfo` on a QM8790 (LID 2052).
pub const IBSWINFO_QM8790: &str = "\
=================================================
# MQM8790-HS2F [lid-2052]
=================================================
part number        | MQM8790-HS2F
serial number      | MT2152T10239
product name       | Jaguar Unmng IB 200
revision           | A1
ports              | 80
PSID               | MT_0000000063
GUID               | 0x506b4b03005c2740
firmware version   | 27.2010.3118
-------------------------------------------------
uptime (d-h:m:s)   | 96d-01:55:47
-------------------------------------------------
PSU0 status        | OK
     P/N           | MTEF-PSF-AC-C
     S/N           | MT2152T09577
     DC power      | OK
     fan status    | OK
     power (W)     | 154
PSU1 status        | OK
     P/N           | MTEF-PSF-AC-C
     S/N           | MT2152T09596
     DC power      | OK
     fan status    | OK
     power (W)     | 134
-------------------------------------------------
temperature (C)    | 53
max temp (C)       | 55
-------------------------------------------------
fan status         | OK
fan#1 (rpm)        | 6125
fan#2 (rpm)        | 5251
fan#3 (rpm)        | 6013
fan#4 (rpm)        | 5335
fan#5 (rpm)        | 6068
fan#6 (rpm)        | 5423
fan#7 (rpm)        | 5854
fan#8 (rpm)        | 5467
fan#9 (rpm)        | 5906
-------------------------------------------------
";

/// `ibswinfo` with PSU1 failed: no power reading, DC power and fan in ERROR.
pub const IBSWINFO_PSU_FAILED: &str = "\
=================================================
# MSB7790-ES2F [lid-1719]
=================================================
part number        | MSB7790-ES2F
serial number      | MT1943X00498
PSID               | MT_1880110032
firmware version   | 11.2008.2102
-------------------------------------------------
uptime (d-h:m:s)   | 160d-10:38:53
-------------------------------------------------
PSU0 status        | OK
     DC power      | OK
     fan status    | OK
     power (W)     | 72
PSU1 status        | ERROR
     DC power      | ERROR
     fan status    | ERROR
-------------------------------------------------
temperature (C)    | 45
-------------------------------------------------
fan status         | OK
fan#1 (rpm)        | 8493
fan#2 (rpm)        |
-------------------------------------------------
";

/// `ibswinfo` with an unparseable PSU power reading.
pub const IBSWINFO_BAD_POWER: &str = "\
part number        | MSB7790-ES2F
-------------------------------------------------
uptime (d-h:m:s)   | 160d-10:38:53
-------------------------------------------------
PSU0 status        | OK
     power (W)     | N/A
-------------------------------------------------
";

/// `ibswinfo` with an unparseable temperature.
pub const IBSWINFO_BAD_TEMPERATURE: &str = "\
part number        | MSB7790-ES2F
-------------------------------------------------
uptime (d-h:m:s)   | 160d-10:38:53
-------------------------------------------------
PSU0 status        | OK
-------------------------------------------------
temperature (C)    | hot
-------------------------------------------------
";

/// `ibswinfo` with an unparseable fan speed.
pub const IBSWINFO_BAD_FAN: &str = "\
part number        | MSB7790-ES2F
-------------------------------------------------
uptime (d-h:m:s)   | 160d-10:38:53
-------------------------------------------------
PSU0 status        | OK
-------------------------------------------------
temperature (C)    | 45
-------------------------------------------------
fan status         | OK
fan#1 (rpm)        | fast
-------------------------------------------------
";

pub const SWITCH_1719_GUID: &str = "0x7cfe9003009ce5b0";
pub const SWITCH_2052_GUID: &str = "0x506b4b03005c2740";
pub const ADAPTER_GUIDS: [&str; 3] = [
    "0x506b4b0300cc02a6",
    "0x7cfe9003003b4b96",
    "0x7cfe9003003b4bde",
];

impl MockRunner {
    /// A healthy fabric answering every command line the collectors issue
    /// under the default configuration (no sudo, default tool paths).
    pub fn healthy_fabric() -> Self {
        let mut runner = Self::new()
            .with_output("ibnetdiscover --ports", IBNETDISCOVER)
            .with_output(
                format!("perfquery -l -x -G {} 1,10,11", SWITCH_1719_GUID),
                PERFQUERY_SWITCH_1719,
            )
            .with_output(
                format!("perfquery -E -G {} 1", SWITCH_1719_GUID),
                PERFQUERY_RCV_ERR,
            )
            .with_output(
                format!("perfquery -E -G {} 2", SWITCH_1719_GUID),
                PERFQUERY_RCV_ERR_PORT2,
            )
            .with_output(
                format!("perfquery -l -x -G {} 35", SWITCH_2052_GUID),
                PERFQUERY_SWITCH_2052,
            )
            .with_output(
                format!("perfquery -E -G {} 1", SWITCH_2052_GUID),
                PERFQUERY_RCV_ERR,
            )
            .with_output("ibswinfo -d lid-1719", IBSWINFO_SB7790)
            .with_output("ibswinfo -d lid-2052", IBSWINFO_QM8790);

        for guid in ADAPTER_GUIDS {
            runner = runner
                .with_output(format!("perfquery -l -x -G {} 1", guid), PERFQUERY_HCA)
                .with_output(format!("perfquery -E -G {} 1", guid), PERFQUERY_RCV_ERR);
        }
        runner
    }
}
